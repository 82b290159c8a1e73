//! Data models for Toolshed

pub mod category;
pub mod enums;
pub mod loan;
pub mod settings;
pub mod tool;
pub mod user;

// Re-export commonly used types
pub use category::Category;
pub use enums::{LoanStatus, Role, ToolStatus};
pub use loan::{BorrowLine, Loan, LoanDetails};
pub use settings::SystemSettings;
pub use tool::Tool;
pub use user::{User, UserShort};
