use std::pin::Pin;

use futures::Stream;
use proto::xcutr::v1::{ExecutionRequest as WireRequest, Log, xcutr_service_server::XcutrService as XcutrServiceTrait};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status};

use crate::{
    auth::user_id_from_request,
    clickhouse::Telemetry,
    domain::ExecutionRequest,
    error::ExecutorError,
    service::{ExecutionEvent, ExecutorService},
};

pub struct XcutrGrpcService {
    executor: ExecutorService,
    telemetry: Telemetry,
    max_timeout_nanos: i64,
}

impl XcutrGrpcService {
    pub fn new(executor: ExecutorService, telemetry: Telemetry, max_timeout_nanos: i64) -> Self {
        Self {
            executor,
            telemetry,
            max_timeout_nanos,
        }
    }
}

pub type ExecuteResponseStream = Pin<Box<dyn Stream<Item = Result<Log, Status>> + Send>>;

/// C4 Streaming RPC Endpoint. Grounded in
/// `xcutr-service/internal/infrastructure/grpc/handlers/handler.go`'s
/// status-code mapping table for `Execute`. Auth (C8) is enforced ahead
/// of this handler by [`crate::auth::ExecutorAuthInterceptor`] — a
/// request that reaches here always carries a verified principal.
#[tonic::async_trait]
impl XcutrServiceTrait for XcutrGrpcService {
    type ExecuteStream = ExecuteResponseStream;

    async fn execute(
        &self,
        request: Request<WireRequest>,
    ) -> Result<Response<Self::ExecuteStream>, Status> {
        let user_id = user_id_from_request(&request);
        let req = request.into_inner();
        let language = req.language.clone();

        let files = req
            .files
            .into_iter()
            .map(|file| (file.name, file.mime, file.body))
            .collect();

        let execution = ExecutionRequest::parse(
            &req.language,
            files,
            req.max_timeout,
            self.max_timeout_nanos,
        )
        .map_err(|err: ExecutorError| Status::from(&err))?;

        if let Some(user_id) = user_id {
            self.telemetry.record_execution(user_id, language);
        }

        let rx = self.executor.execute(execution);
        let stream = ReceiverStream::new(rx).map(|event| match event {
            Ok(ExecutionEvent::Log(msg)) => Ok(Log { msg }),
            Err(err) => Err(Status::from(&err)),
        });

        Ok(Response::new(Box::pin(stream)))
    }
}
