pub mod battery;
pub mod dispatch;
pub mod flow;
pub mod investment;
pub mod price;
pub mod provider;
pub mod record;
pub mod roi;
pub mod simulator;
pub mod summary;
