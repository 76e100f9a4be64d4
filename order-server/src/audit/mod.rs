//! 审计日志模块: 订单生命周期防篡改审计追踪
//!
//! # 架构
//!
//! ```text
//! OrderService 变更
//!   └─ OrderStorage 写事务 ─┬─ orders 表
//!                           └─ AuditLog::append_txn → audit_log + order_audit 索引
//!
//! SHA256 哈希链: genesis → entry₁ → entry₂ → ... → entryₙ
//! ```
//!
//! # 防篡改保证
//!
//! - **SHA256 哈希链**: 每条记录包含前一条的哈希
//! - **Append-only**: 无删除/更新接口
//! - **同事务提交**: 订单状态与审计条目原子可见
//! - **链验证 API**: `GET /api/audit/verify` 可随时验证完整性

pub mod diff;
pub mod log;

pub use diff::{all_added, diff_lines};
pub use log::{AuditLog, AuditRecord};
