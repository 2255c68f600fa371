#![forbid(unsafe_code)]

mod logged_apps;
mod running_set;

pub use logged_apps::LoggedApps;
pub use running_set::RunningSet;
