//! 领域模型
//!
//! 会议、赞助等级、赞助记录以及其物料和发货子记录

mod enums;
mod shipment;
mod sponsorship;
mod swag;

pub use enums::*;
pub use shipment::*;
pub use sponsorship::*;
pub use swag::*;
