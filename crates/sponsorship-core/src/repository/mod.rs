//! 仓储层
//!
//! `SponsorshipRepository` 基于 Postgres，`MemorySponsorshipRepository` 基于内存，
//! 两者实现同一个 trait，服务层只依赖 trait。

mod memory_repo;
mod sponsorship_repo;
mod traits;

pub use memory_repo::MemorySponsorshipRepository;
pub use sponsorship_repo::{SponsorshipRepository, TRACK_NO_CONSTRAINT};
pub use traits::{RemovedChildren, SponsorshipRepositoryTrait};

#[cfg(test)]
pub use traits::MockSponsorshipRepositoryTrait;
