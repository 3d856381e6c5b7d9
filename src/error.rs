use fleet_checkin_common::FieldError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FleetError {
    /// ローカル検証エラー（先頭のメッセージを表示）
    #[error("{}", first_message(.0))]
    Validation(Vec<FieldError>),

    #[error("KM inválida. Verifique o valor informado.")]
    KmRejected,

    #[error("Não foi possível validar a KM: {0}")]
    KmCheckFailed(String),

    #[error("Erro de conexão: {0}")]
    Network(String),

    #[error("{0}")]
    MalformedResponse(String),

    #[error("{0}")]
    Server(String),

    #[error("Sessão expirada. Faça login novamente.")]
    SessionExpired,

    #[error("Link inválido: {0}")]
    InvalidLink(String),

    #[error("{message}")]
    QrRejected { kind: QrRejection, message: String },

    #[error("Arquivo muito grande: {name} ({size_mb:.1} MB, máximo {max_mb} MB)")]
    FileTooLarge { name: String, size_mb: f64, max_mb: u64 },

    #[error("Limite de fotos excedido. Você pode adicionar no máximo {remaining} foto(s).")]
    PhotoLimitExceeded { remaining: usize },

    #[error("Erro ao processar imagem: {0}")]
    Compression(String),

    #[error("Envio já em andamento")]
    SubmitInFlight,

    #[error("Operação cancelada")]
    Cancelled,

    #[error("Erro ao desenhar: {0}")]
    Render(String),

    #[error("Arquivo não encontrado: {0}")]
    FileNotFound(String),

    #[error("Pasta não encontrada: {0}")]
    FolderNotFound(String),

    #[error("Erro de imagem: {0}")]
    Image(#[from] image::ImageError),

    #[error("Erro de E/S: {0}")]
    Io(#[from] std::io::Error),

    #[error("Erro de JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Erro de configuração: {0}")]
    Config(String),

    #[error("Erro de entrada: {0}")]
    Prompt(String),
}

/// QR拒否の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QrRejection {
    /// 別の会社でログインしている
    WrongCompany,
    /// 車両が使用中
    VehicleInUse,
    Generic,
}

fn first_message(errors: &[FieldError]) -> String {
    errors
        .first()
        .map(|e| e.message.clone())
        .unwrap_or_else(|| "Por favor, corrija os erros no formulário.".to_string())
}

impl FleetError {
    /// 手動リトライの対象か
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FleetError::Network(_) | FleetError::KmCheckFailed(_) | FleetError::Server(_)
        )
    }

    /// トースト/画面表示用のメッセージ
    pub fn user_message(&self) -> String {
        match self {
            FleetError::Network(_) => {
                "Erro de conexão. Verifique sua internet e tente novamente.".to_string()
            }
            FleetError::Image(_) | FleetError::Compression(_) | FleetError::Render(_) => {
                "Erro ao processar imagem. Tente novamente.".to_string()
            }
            other => other.to_string(),
        }
    }

    /// トーストのタイトル
    pub fn toast_title(&self) -> &'static str {
        match self {
            FleetError::Validation(_) | FleetError::KmRejected | FleetError::PhotoLimitExceeded { .. } => {
                "Atenção"
            }
            FleetError::FileTooLarge { .. } => "Arquivo muito grande",
            FleetError::Network(_) | FleetError::KmCheckFailed(_) => "Erro de conexão",
            FleetError::QrRejected { kind: QrRejection::WrongCompany, .. } => "Empresa incorreta",
            FleetError::QrRejected { kind: QrRejection::VehicleInUse, .. } => "Veículo em uso",
            FleetError::QrRejected { .. } | FleetError::InvalidLink(_) => "QR Code inválido",
            FleetError::SessionExpired => "Sessão expirada",
            FleetError::Cancelled => "Cancelado",
            _ => "Erro",
        }
    }

    /// 検証エラーのときのフィールド一覧
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            FleetError::Validation(errors) => errors,
            _ => &[],
        }
    }
}

impl From<fleet_checkin_common::Error> for FleetError {
    fn from(err: fleet_checkin_common::Error) -> Self {
        match err {
            fleet_checkin_common::Error::Validation(errors) => FleetError::Validation(errors),
            fleet_checkin_common::Error::Json(e) => FleetError::Json(e),
        }
    }
}

impl From<dialoguer::Error> for FleetError {
    fn from(err: dialoguer::Error) -> Self {
        FleetError::Prompt(err.to_string())
    }
}

impl From<reqwest::Error> for FleetError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FleetError::MalformedResponse("Resposta inválida do servidor.".to_string())
        } else {
            FleetError::Network(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, FleetError>;
