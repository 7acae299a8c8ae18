//! # Scheduler 模块
//!
//! 确定性的单线程计时器队列。
//!
//! 使用虚拟毫秒时钟，由宿主通过 [`Scheduler::pop_due`] / [`Scheduler::set_now`]
//! 推动时间前进。同一时刻到期的计时器按登记顺序触发。
//!
//! 每个计时器记录登记它的指令 id（[`TimerOwner`]）。计时器可以按句柄单独取消，
//! 导航或重置时全部取消，过期回调不会改写之后的状态。

use std::collections::BTreeMap;

use crate::runtime::result::Continuation;

/// 计时器句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

/// 计时器所属指令 id
pub type TimerOwner = String;

/// 到期的计时器
#[derive(Debug, Clone, PartialEq)]
pub struct Timer {
    pub handle: TimerHandle,
    pub owner: TimerOwner,
    pub deadline: u64,
    pub continuation: Continuation,
}

/// 计时器队列
#[derive(Debug, Default)]
pub struct Scheduler {
    now: u64,
    next_seq: u64,
    /// (到期时间, 登记序号) -> 计时器
    timers: BTreeMap<(u64, u64), Timer>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前虚拟时间（毫秒）
    pub fn now(&self) -> u64 {
        self.now
    }

    /// 登记一个 `delay` 毫秒后到期的计时器
    pub fn schedule(
        &mut self,
        owner: impl Into<TimerOwner>,
        delay: u64,
        continuation: Continuation,
    ) -> TimerHandle {
        let seq = self.next_seq;
        self.next_seq += 1;
        let handle = TimerHandle(seq);
        let deadline = self.now.saturating_add(delay);
        self.timers.insert(
            (deadline, seq),
            Timer {
                handle,
                owner: owner.into(),
                deadline,
                continuation,
            },
        );
        handle
    }

    /// 取消指定计时器，返回是否确有取消
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.timers.len();
        self.timers.retain(|_, t| t.handle != handle);
        self.timers.len() != before
    }

    /// 取消全部计时器
    pub fn cancel_all(&mut self) {
        self.timers.clear();
    }

    pub fn get(&self, handle: TimerHandle) -> Option<&Timer> {
        self.timers.values().find(|t| t.handle == handle)
    }

    /// 最早的到期时间
    pub fn next_deadline(&self) -> Option<u64> {
        self.timers.keys().next().map(|(deadline, _)| *deadline)
    }

    /// 取出一个在 `until` 之前（含）到期的计时器，并把时钟拨到它的到期时间
    pub fn pop_due(&mut self, until: u64) -> Option<Timer> {
        let key = *self.timers.keys().next()?;
        if key.0 > until {
            return None;
        }
        let timer = self.timers.remove(&key)?;
        self.now = self.now.max(timer.deadline);
        Some(timer)
    }

    /// 把时钟拨到 `now`（不会倒退）
    pub fn set_now(&mut self, now: u64) {
        self.now = self.now.max(now);
    }

    pub fn pending(&self) -> usize {
        self.timers.len()
    }
}
