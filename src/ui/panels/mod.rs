pub mod connect;
pub mod files;
pub mod logs;

pub use connect::ConnectPanel;
pub use files::FilesPanel;
pub use logs::LogsPanel;
