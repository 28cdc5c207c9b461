use std::fmt;

use actix_web::http::StatusCode;

#[derive(Debug, Clone)]
pub enum PortalError {
    Config(String),
    DatabaseConfig(String),
    DatabaseConnection(String),
    DatabaseOperation(String),
    FileOperation(String),
    Validation(String),
    NotFound(String),
    Unauthorized(String),
    Forbidden(String),
    Serialization(String),
    ExternalService(String),
    Template(String),
    PasswordHash(String),
}

impl PortalError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            PortalError::Config(_) => "E001",
            PortalError::DatabaseConfig(_) => "E002",
            PortalError::DatabaseConnection(_) => "E003",
            PortalError::DatabaseOperation(_) => "E004",
            PortalError::FileOperation(_) => "E005",
            PortalError::Validation(_) => "E006",
            PortalError::NotFound(_) => "E007",
            PortalError::Unauthorized(_) => "E008",
            PortalError::Forbidden(_) => "E009",
            PortalError::Serialization(_) => "E010",
            PortalError::ExternalService(_) => "E011",
            PortalError::Template(_) => "E012",
            PortalError::PasswordHash(_) => "E013",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            PortalError::Config(_) => "Configuration Error",
            PortalError::DatabaseConfig(_) => "Database Configuration Error",
            PortalError::DatabaseConnection(_) => "Database Connection Error",
            PortalError::DatabaseOperation(_) => "Database Operation Error",
            PortalError::FileOperation(_) => "File Operation Error",
            PortalError::Validation(_) => "Validation Error",
            PortalError::NotFound(_) => "Resource Not Found",
            PortalError::Unauthorized(_) => "Unauthorized",
            PortalError::Forbidden(_) => "Forbidden",
            PortalError::Serialization(_) => "Serialization Error",
            PortalError::ExternalService(_) => "External Service Error",
            PortalError::Template(_) => "Template Error",
            PortalError::PasswordHash(_) => "Password Hashing Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            PortalError::Config(msg)
            | PortalError::DatabaseConfig(msg)
            | PortalError::DatabaseConnection(msg)
            | PortalError::DatabaseOperation(msg)
            | PortalError::FileOperation(msg)
            | PortalError::Validation(msg)
            | PortalError::NotFound(msg)
            | PortalError::Unauthorized(msg)
            | PortalError::Forbidden(msg)
            | PortalError::Serialization(msg)
            | PortalError::ExternalService(msg)
            | PortalError::Template(msg)
            | PortalError::PasswordHash(msg) => msg,
        }
    }

    /// HTTP status used when the error reaches a handler boundary
    pub fn http_status(&self) -> StatusCode {
        match self {
            PortalError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PortalError::NotFound(_) => StatusCode::NOT_FOUND,
            PortalError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            PortalError::Forbidden(_) => StatusCode::FORBIDDEN,
            PortalError::ExternalService(_) => StatusCode::BAD_GATEWAY,
            PortalError::Config(_)
            | PortalError::DatabaseConfig(_)
            | PortalError::DatabaseConnection(_)
            | PortalError::DatabaseOperation(_)
            | PortalError::FileOperation(_)
            | PortalError::Serialization(_)
            | PortalError::Template(_)
            | PortalError::PasswordHash(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the message is safe to show to the person using the portal
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            PortalError::Validation(_)
                | PortalError::NotFound(_)
                | PortalError::Unauthorized(_)
                | PortalError::Forbidden(_)
                | PortalError::ExternalService(_)
        )
    }

    /// 格式化为彩色输出（用于启动失败）
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for PortalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for PortalError {}

// 便捷的构造函数
impl PortalError {
    pub fn config<T: Into<String>>(msg: T) -> Self {
        PortalError::Config(msg.into())
    }

    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        PortalError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        PortalError::DatabaseConnection(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        PortalError::DatabaseOperation(msg.into())
    }

    pub fn file_operation<T: Into<String>>(msg: T) -> Self {
        PortalError::FileOperation(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        PortalError::Validation(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        PortalError::NotFound(msg.into())
    }

    pub fn unauthorized<T: Into<String>>(msg: T) -> Self {
        PortalError::Unauthorized(msg.into())
    }

    pub fn forbidden<T: Into<String>>(msg: T) -> Self {
        PortalError::Forbidden(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        PortalError::Serialization(msg.into())
    }

    pub fn external_service<T: Into<String>>(msg: T) -> Self {
        PortalError::ExternalService(msg.into())
    }

    pub fn template<T: Into<String>>(msg: T) -> Self {
        PortalError::Template(msg.into())
    }

    pub fn password_hash<T: Into<String>>(msg: T) -> Self {
        PortalError::PasswordHash(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for PortalError {
    fn from(err: sea_orm::DbErr) -> Self {
        PortalError::DatabaseOperation(err.to_string())
    }
}

impl From<std::io::Error> for PortalError {
    fn from(err: std::io::Error) -> Self {
        PortalError::FileOperation(err.to_string())
    }
}

impl From<serde_json::Error> for PortalError {
    fn from(err: serde_json::Error) -> Self {
        PortalError::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for PortalError {
    fn from(err: config::ConfigError) -> Self {
        PortalError::Config(err.to_string())
    }
}

impl From<handlebars::RenderError> for PortalError {
    fn from(err: handlebars::RenderError) -> Self {
        PortalError::Template(err.to_string())
    }
}

impl actix_web::ResponseError for PortalError {
    fn status_code(&self) -> StatusCode {
        self.http_status()
    }

    fn error_response(&self) -> actix_web::HttpResponse {
        let message = if self.is_user_facing() {
            self.message()
        } else {
            "Something went wrong. Please try again later."
        };
        actix_web::HttpResponse::build(self.http_status())
            .content_type("text/html; charset=utf-8")
            .body(format!(
                "<!doctype html><html><body><main><h1>{}</h1><p data-test=\"error-message\">{}</p></main></body></html>",
                handlebars::html_escape(self.error_type()),
                handlebars::html_escape(message)
            ))
    }
}

pub type Result<T> = std::result::Result<T, PortalError>;
