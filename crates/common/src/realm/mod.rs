//! Realm 模块
//!
//! Realm 是身份与权限的隔离命名空间。
//!
//! - `model.rs` - Realm 实体
//! - `state.rs` - 单个 Realm 的完整内存状态（身份图 + 权限账本）
//! - `validation.rs` - 状态结构完整性校验

pub mod model;
pub mod state;
pub mod validation;

pub use model::Realm;
pub use state::RealmState;
