pub mod scheduler;
pub mod session;

pub use scheduler::DownloadScheduler;
pub use session::DownloadSession;
