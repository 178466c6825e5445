//! 协作方的内存实现。
//!
//! 不依赖真实的 OData 服务即可驱动整个导航流程；
//! 每个实现都记录收到的调用，便于断言。

mod model;
mod page;

pub use model::*;
pub use page::*;
