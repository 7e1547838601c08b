//! 地理定向通知服务
//!
//! 设备上报所在的地理格子，通知携带有效期与目标格子列表。
//! 调度器周期性地为每条有效通知找出目标格子内尚未通知的设备，
//! 通过可插拔的投递渠道发送，并把成功的接收者写入投递账本避免重复发送。

pub mod channels;
pub mod context;
pub mod error;
pub mod events;
pub mod geo_index;
pub mod ledger;
pub mod models;
pub mod resolver;
pub mod router;
pub mod scheduler;

pub use context::GeoNotifier;
pub use models::Notification;
