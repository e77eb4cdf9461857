//! Page objects for the dashboard's login screen and board

pub mod dashboard;
pub mod login;

pub use dashboard::DashboardPage;
pub use login::{sign_in, LoginPage};
