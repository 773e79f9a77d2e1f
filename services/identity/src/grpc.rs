use proto::sso::v1::{
    Empty, GetByIdRequest, LoginRequest, RefreshRequest, RegisterRequest, Token, UpdateRequest,
    User as UserProto, sso_service_server::SsoService as SsoServiceTrait,
};
use tonic::{Request, Response, Status};

use crate::{interceptor::user_id_from_request, service::IdentityService, user::User};

pub struct SsoGrpcService {
    identity: IdentityService,
}

impl SsoGrpcService {
    pub fn new(identity: IdentityService) -> Self {
        Self { identity }
    }
}

fn to_proto_user(user: User) -> UserProto {
    UserProto {
        id: user.id.to_string(),
        email: user.email.as_str().to_string(),
        username: user.username.as_str().to_string(),
    }
}

#[tonic::async_trait]
impl SsoServiceTrait for SsoGrpcService {
    async fn register(
        &self,
        request: Request<RegisterRequest>,
    ) -> Result<Response<Token>, Status> {
        let req = request.into_inner();
        let pair = self
            .identity
            .register(&req.email, &req.username, &req.password)
            .await
            .map_err(|err| Status::from(&err))?;
        Ok(Response::new(Token {
            access: pair.access,
            refresh: pair.refresh,
        }))
    }

    async fn login(&self, request: Request<LoginRequest>) -> Result<Response<Token>, Status> {
        let req = request.into_inner();
        let pair = self
            .identity
            .login(&req.email, &req.password)
            .await
            .map_err(|err| Status::from(&err))?;
        Ok(Response::new(Token {
            access: pair.access,
            refresh: pair.refresh,
        }))
    }

    async fn refresh(&self, request: Request<RefreshRequest>) -> Result<Response<Token>, Status> {
        let req = request.into_inner();
        let pair = self
            .identity
            .refresh(&req.refresh_token)
            .await
            .map_err(|err| Status::from(&err))?;
        Ok(Response::new(Token {
            access: pair.access,
            refresh: pair.refresh,
        }))
    }

    async fn update_user(&self, request: Request<UpdateRequest>) -> Result<Response<Empty>, Status> {
        let user_id = user_id_from_request(&request).map_err(|err| Status::from(&err))?;
        let req = request.into_inner();
        self.identity
            .update_user(&user_id, &req.username)
            .await
            .map_err(|err| Status::from(&err))?;
        Ok(Response::new(Empty {}))
    }

    async fn get_user_by_id(
        &self,
        request: Request<GetByIdRequest>,
    ) -> Result<Response<UserProto>, Status> {
        let req = request.into_inner();
        let user = self
            .identity
            .get_user_by_id(&req.user_id)
            .await
            .map_err(|err| Status::from(&err))?;
        Ok(Response::new(to_proto_user(user)))
    }

    async fn get_self(&self, request: Request<Empty>) -> Result<Response<UserProto>, Status> {
        let user_id = user_id_from_request(&request).map_err(|err| Status::from(&err))?;
        let user = self
            .identity
            .get_self(&user_id)
            .await
            .map_err(|err| Status::from(&err))?;
        Ok(Response::new(to_proto_user(user)))
    }
}
