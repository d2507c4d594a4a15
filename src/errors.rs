//! Typed error hierarchy for Sitecraft.
//!
//! One enum per subsystem:
//! - `PatchError`: fragment lookups that found nothing to patch
//! - `ProviderError`: AI provider calls (network, status, timeout, shape)
//! - `RegionError`: selection commit and rasterization
//! - `RefineError`: refinement payload validation
//! - `VideoError`: yt-dlp metadata/download runs
//! - `StoreError`: project persistence
//! - `ChatError`: session-level failures that cannot be absorbed in a turn
//!
//! All of them are recoverable: they are scoped to the single action that
//! produced them.

use sitecraft_common::InvalidRegion;
use thiserror::Error;

/// Errors from the patch applier.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PatchError {
    #[error("No element with data-id '{data_id}' was found")]
    ElementNotFound { data_id: String },

    #[error("Element '{data_id}' is not an image")]
    NotAnImage { data_id: String },
}

/// Errors from an AI provider call.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Request to AI provider failed: {0}")]
    Http(#[source] reqwest::Error),

    #[error("AI provider returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Tempo esgotado ao comunicar com a IA.")]
    Timeout { secs: u64 },

    #[error("Malformed provider response: {0}")]
    Malformed(String),

    #[error("API key not configured (set {env})")]
    MissingApiKey { env: String },

    #[error("Request cancelled")]
    Cancelled,
}

/// Errors from region selection and cropping.
#[derive(Debug, Error)]
pub enum RegionError {
    #[error("Selection of {width:.0}x{height:.0}px is too small")]
    Degenerate { width: f64, height: f64 },

    #[error(transparent)]
    Invalid(#[from] InvalidRegion),

    #[error("Failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("Failed to encode crop: {0}")]
    Encode(#[source] image::ImageError),

    #[error("Failed to load image from {url}: {message}")]
    Fetch { url: String, message: String },
}

/// Errors from building a refinement request.
#[derive(Debug, Error)]
pub enum RefineError {
    #[error("instruction é obrigatória")]
    EmptyInstruction,

    #[error(transparent)]
    Region(#[from] RegionError),
}

/// Which video operation failed; selects the user-facing wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoOp {
    Metadata,
    Download,
}

/// Classified downloader failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloaderFailure {
    Private,
    Unavailable,
    RegionLocked,
    Timeout,
    Unauthorized,
    Other,
}

/// Errors from the video tools.
#[derive(Debug, Error)]
pub enum VideoError {
    #[error("URL do vídeo ou media_id é obrigatório")]
    MissingInput,

    #[error("Mídia não encontrada")]
    MediaNotFound { media_id: String },

    #[error("URL do vídeo inválida: use um endereço http(s)")]
    InvalidUrl { url: String },

    #[error("yt-dlp failed ({kind:?}): {detail}")]
    Downloader {
        op: VideoOp,
        kind: DownloaderFailure,
        detail: String,
    },

    #[error("Failed to spawn {cmd}: {source}")]
    Spawn {
        cmd: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse yt-dlp output: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("yt-dlp finished without producing a file")]
    NoOutput,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to store {path}: {message}")]
    Store { path: String, message: String },
}

impl VideoError {
    /// Message safe to show to end users.
    pub fn user_message(&self) -> String {
        match self {
            VideoError::MissingInput
            | VideoError::MediaNotFound { .. }
            | VideoError::InvalidUrl { .. } => self.to_string(),
            VideoError::Downloader { op, kind, .. } => match (op, kind) {
                (VideoOp::Metadata, DownloaderFailure::Private) => {
                    "Este vídeo é privado ou requer login. Não é possível acessá-lo.".to_string()
                }
                (VideoOp::Download, DownloaderFailure::Private) => {
                    "Este vídeo é privado e não pode ser baixado.".to_string()
                }
                (VideoOp::Metadata, DownloaderFailure::Unavailable) => {
                    "Este vídeo não está disponível ou foi removido.".to_string()
                }
                (VideoOp::Download, DownloaderFailure::Unavailable) => {
                    "Este vídeo não está disponível.".to_string()
                }
                (_, DownloaderFailure::RegionLocked) => {
                    "Este vídeo não está disponível na sua região.".to_string()
                }
                (_, DownloaderFailure::Timeout) => {
                    "O processamento do vídeo demorou demais. Tente novamente.".to_string()
                }
                (_, DownloaderFailure::Unauthorized) => {
                    "Acesso ao vídeo não autorizado pela plataforma.".to_string()
                }
                (op, DownloaderFailure::Other) => generic_video_message(*op).to_string(),
            },
            VideoError::Spawn { .. } | VideoError::Parse(_) | VideoError::Io(_) => {
                generic_video_message(VideoOp::Metadata).to_string()
            }
            VideoError::NoOutput | VideoError::Store { .. } => {
                generic_video_message(VideoOp::Download).to_string()
            }
        }
    }

    /// Whether the failure was caused by the request rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            VideoError::MissingInput
                | VideoError::MediaNotFound { .. }
                | VideoError::InvalidUrl { .. }
                | VideoError::Downloader { .. }
        )
    }
}

fn generic_video_message(op: VideoOp) -> &'static str {
    match op {
        VideoOp::Metadata => {
            "Não foi possível obter os metadados do vídeo. Verifique a URL ou tente novamente."
        }
        VideoOp::Download => "Não foi possível baixar o vídeo. Tente novamente.",
    }
}

/// Errors from project persistence.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Project {id} not found")]
    ProjectNotFound { id: String },

    #[error("Project {id} changed concurrently (expected revision {expected}, found {found})")]
    RevisionConflict { id: String, expected: u64, found: u64 },

    #[error("Failed to access {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt project file: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Session-level failures.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Mensagem vazia")]
    EmptyMessage,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
