//! # Runtime 模块
//!
//! 指令调度核心。
//!
//! ## 模块结构
//!
//! - [`session`]：游戏会话，推进循环与阻塞解除事件
//! - [`dispatcher`]：指令到处理器的路由
//! - [`handlers`]：各类指令的处理器
//! - [`result`]：处理器返回的结果与状态补丁
//! - [`scheduler`]：虚拟时钟上的计时器队列
//! - [`button`]：按钮动作的执行顺序

pub mod button;
pub mod dispatcher;
pub mod handlers;
pub mod result;
pub mod scheduler;
pub mod session;

pub use result::{Continuation, HandlerResult, Navigation, StatePatch};
pub use scheduler::{Scheduler, Timer, TimerHandle};
pub use session::GameSession;
