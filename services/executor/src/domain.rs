use crate::error::ExecutorError;

/// Upper bound on a single submitted file's body, matching
/// `xcutr-service/internal/domain/container/vo.go`'s
/// `1 <= len(bytes) <= 1024*1024*60` (60 MiB).
pub const MAX_FILE_SIZE_BYTES: usize = 60 * 1024 * 1024;

/// The one file name every request must carry, matching
/// `services.go`'s `createCont` (`if file.GetName() == "main"`).
const MAIN_FILE_NAME: &str = "main";

/// Supported execution languages, matching the string keys
/// `xcutr-service/internal/application/service/services.go`'s `New`
/// registers in its `lang` map (`"golang"`, `"python"`) rather than the
/// domain `Lang` iota, since the wire request carries the language as a
/// string (see spec.md §6's `ExecutionRequest`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lang {
    Go,
    Python,
}

impl Lang {
    pub fn parse(raw: &str) -> Result<Self, ExecutorError> {
        match raw {
            "golang" => Ok(Lang::Go),
            "python" => Ok(Lang::Python),
            _ => Err(ExecutorError::InvalidLanguage),
        }
    }

    /// Selects the image matching the requested language. The original
    /// Go implementation (`container_repository.go`) always pulled the
    /// configured Go image regardless of the requested language; this is
    /// the corrected behavior required by the owning specification.
    pub fn image<'a>(&self, images: &'a ImageConfig) -> &'a str {
        match self {
            Lang::Go => &images.go,
            Lang::Python => &images.python,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Lang::Go => "go",
            Lang::Python => "python",
        }
    }

    /// The language-appropriate entrypoint command, matching
    /// `container_repository.go`'s `createCont` (`"go", []string{"run",
    /// "./main.go"}` / `"python", []string{"./main.py"}`).
    pub fn command(&self) -> Vec<String> {
        match self {
            Lang::Go => vec!["go".to_string(), "run".to_string(), "./main.go".to_string()],
            Lang::Python => vec!["python".to_string(), "./main.py".to_string()],
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImageConfig {
    pub go: String,
    pub python: String,
}

/// Validated file value object, grounded in `container/vo.go`'s `NewFile`:
/// trimmed non-empty name, trimmed mime (may be empty), body within
/// `[1, 60 MiB]`. The container file layout places this at
/// `/<name>.<mime>` (see [`crate::container::build_tar_archive`]).
#[derive(Debug, Clone)]
pub struct File {
    pub name: String,
    pub mime: String,
    pub body: Vec<u8>,
}

impl File {
    pub fn parse(name: &str, mime: &str, body: Vec<u8>) -> Result<Self, ExecutorError> {
        let trimmed_name = name.trim();
        if trimmed_name.is_empty() {
            return Err(ExecutorError::InvalidFilename);
        }
        if body.is_empty() {
            return Err(ExecutorError::EmptyFile);
        }
        if body.len() > MAX_FILE_SIZE_BYTES {
            return Err(ExecutorError::TooLargeFile);
        }
        Ok(Self {
            name: trimmed_name.to_string(),
            mime: mime.trim().to_string(),
            body,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub lang: Lang,
    pub max_timeout: std::time::Duration,
    pub files: Vec<File>,
}

impl ExecutionRequest {
    /// `max_timeout_nanos` and `max_ceiling_nanos` mirror `services.go`'s
    /// `createCont`, which compares `time.Duration(req.GetMaxTimeout())`
    /// (wire nanoseconds) against `cfg.Service.MaxTimeout` directly.
    pub fn parse(
        language: &str,
        files: Vec<(String, String, Vec<u8>)>,
        max_timeout_nanos: i64,
        max_ceiling_nanos: i64,
    ) -> Result<Self, ExecutorError> {
        if files.is_empty() {
            return Err(ExecutorError::NoFiles);
        }

        let files = files
            .into_iter()
            .map(|(name, mime, body)| File::parse(&name, &mime, body))
            .collect::<Result<Vec<_>, _>>()?;

        if !files.iter().any(|f| f.name == MAIN_FILE_NAME) {
            return Err(ExecutorError::NoMain);
        }

        if max_timeout_nanos <= 0 || max_timeout_nanos > max_ceiling_nanos {
            return Err(ExecutorError::TooLargeTimeout);
        }

        let lang = Lang::parse(language)?;

        Ok(Self {
            lang,
            max_timeout: std::time::Duration::from_nanos(max_timeout_nanos as u64),
            files,
        })
    }
}
