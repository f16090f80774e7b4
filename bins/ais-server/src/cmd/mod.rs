pub mod inspect;
pub mod partitions;
pub mod serve;
