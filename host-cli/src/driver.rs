//! # Driver 模块
//!
//! 无头驱动：代替玩家回应阻塞提示，并推动虚拟时钟。
//!
//! ## 调度
//!
//! ```text
//! step():
//!   Blocked -> 回应当前提示（对话/选项/输入/视频/按钮/点击），或等待过渡结束
//!   Running -> 把时钟拨到下一个计时器到期
//!   Finished / Idle -> 结束
//! ```
//!
//! 选项与文本输入按 [`AnswerScript`] 的顺序作答，用完后选第一个选项、
//! 输入框填占位文字。`realtime` 模式下按真实时间等待计时器。

use std::collections::VecDeque;
use std::thread;
use std::time::Duration;

use scene_runtime::transition::{RenderPhase, pose_for};
use scene_runtime::{
    EntryPhases, GameSession, OverlayAction, PlayerMode, PlayerStatus, Rect, TransitionKind,
};
use tracing::{debug, info, warn};

use crate::config::{AnswerScript, AppConfig};
use crate::error::HostResult;
use crate::save_manager::SaveManager;

/// 单步结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// 回应了一个阻塞提示
    Responded,
    /// 时钟前进了若干毫秒
    ClockAdvanced(u64),
    /// 播放结束
    Finished,
    /// 既没有提示也没有计时器，无法继续
    Stalled,
}

/// 一次运行的结果
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub steps: usize,
    pub finished: bool,
    /// 运行结束时的虚拟时间（毫秒）
    pub virtual_ms: u64,
    pub transcript: Vec<String>,
}

/// 当前需要回应的提示
enum Prompt {
    Dialogue(String),
    Choice(Vec<String>),
    TextInput {
        prompt: String,
        placeholder: Option<String>,
    },
    Movie(String),
    Button { id: String, text: String },
    /// 只能由点击结束的等待
    Click,
    Transition,
    Paused,
    Screen,
}

/// 无头驱动
pub struct HeadlessDriver {
    session: GameSession,
    choices: VecDeque<usize>,
    text_inputs: VecDeque<String>,
    realtime: bool,
    max_steps: usize,
    phases: EntryPhases,
    transcript: Vec<String>,
}

impl HeadlessDriver {
    pub fn new(session: GameSession, config: &AppConfig) -> Self {
        let AnswerScript {
            choices,
            text_inputs,
        } = config.answers.clone();
        Self {
            session,
            choices: choices.into(),
            text_inputs: text_inputs.into(),
            realtime: config.realtime,
            max_steps: config.max_steps,
            phases: EntryPhases::new(),
            transcript: Vec::new(),
        }
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut GameSession {
        &mut self.session
    }

    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    /// 运行到结束、卡住或达到步数上限
    pub fn run(&mut self) -> HostResult<RunSummary> {
        let mut steps = 0;
        let finished = loop {
            if steps >= self.max_steps {
                warn!(max_steps = self.max_steps, "达到步数上限，停止运行");
                break false;
            }
            steps += 1;
            match self.step()? {
                Step::Finished => break true,
                Step::Stalled => break false,
                Step::Responded | Step::ClockAdvanced(_) => {}
            }
        };

        info!(steps, finished, virtual_ms = self.session.now(), "运行结束");
        Ok(RunSummary {
            steps,
            finished,
            virtual_ms: self.session.now(),
            transcript: self.transcript.clone(),
        })
    }

    /// 执行一步
    pub fn step(&mut self) -> HostResult<Step> {
        self.observe_stage();
        self.drain_effects();

        match self.session.status() {
            PlayerStatus::Idle | PlayerStatus::Finished => Ok(Step::Finished),
            PlayerStatus::Blocked => self.respond(),
            PlayerStatus::Running => Ok(self.pump_clock()),
        }
    }

    fn current_prompt(&self) -> Option<Prompt> {
        let state = self.session.state()?;
        match state.mode {
            PlayerMode::Paused => return Some(Prompt::Paused),
            PlayerMode::Menu => return Some(Prompt::Screen),
            PlayerMode::Playing => {}
        }

        let ui = &state.ui_state;
        if let Some(line) = &ui.dialogue {
            let text = match &line.speaker {
                Some(speaker) => format!("{}: {}", speaker, line.text),
                None => line.text.clone(),
            };
            return Some(Prompt::Dialogue(text));
        }
        if let Some(set) = &ui.choices {
            return Some(Prompt::Choice(
                set.options.iter().map(|o| o.text.clone()).collect(),
            ));
        }
        if let Some(request) = &ui.text_input {
            return Some(Prompt::TextInput {
                prompt: request.prompt.clone(),
                placeholder: request.placeholder.clone(),
            });
        }
        if let Some(url) = &ui.movie_url {
            return Some(Prompt::Movie(url.clone()));
        }
        if let Some(id) = &ui.waiting_button_id {
            let text = state
                .stage_state
                .button(id)
                .map(|b| b.text.clone())
                .unwrap_or_default();
            return Some(Prompt::Button {
                id: id.clone(),
                text,
            });
        }
        if self.session.is_awaiting_click() {
            return Some(Prompt::Click);
        }
        ui.is_transitioning.then_some(Prompt::Transition)
    }

    fn respond(&mut self) -> HostResult<Step> {
        let Some(prompt) = self.current_prompt() else {
            warn!("处于阻塞状态但没有可回应的提示");
            return Ok(Step::Stalled);
        };

        match prompt {
            Prompt::Dialogue(text) => {
                self.transcript.push(text);
                self.session.finish_dialogue()?;
            }
            Prompt::Choice(options) => {
                let mut index = self.choices.pop_front().unwrap_or(0);
                if index >= options.len() {
                    warn!(index, available = options.len(), "预设选项超出范围，改选第一个");
                    index = 0;
                }
                self.transcript.push(format!("> {}", options[index]));
                self.session.select_choice(index)?;
            }
            Prompt::TextInput {
                prompt,
                placeholder,
            } => {
                let value = self
                    .text_inputs
                    .pop_front()
                    .or(placeholder)
                    .unwrap_or_default();
                self.transcript.push(format!("> {} {}", prompt, value));
                self.session.submit_text_input(&value)?;
            }
            Prompt::Movie(url) => {
                self.transcript.push(format!("[movie] {}", url));
                self.session.finish_movie()?;
            }
            Prompt::Button { id, text } => {
                self.transcript.push(format!("[button] {}", text));
                self.session.click_button(&id)?;
            }
            Prompt::Click => {
                self.transcript.push("[click]".to_string());
                self.session.click()?;
            }
            Prompt::Transition => return Ok(self.pump_clock()),
            Prompt::Paused => self.session.resume()?,
            Prompt::Screen => {
                self.session.close_screen()?;
            }
        }
        Ok(Step::Responded)
    }

    /// 把时钟拨到下一个计时器到期
    fn pump_clock(&mut self) -> Step {
        let Some(deadline) = self.session.next_deadline() else {
            self.session.advance();
            return match self.session.status() {
                PlayerStatus::Finished | PlayerStatus::Idle => Step::Finished,
                _ if self.session.next_deadline().is_some() => Step::Responded,
                _ => {
                    warn!("没有待触发的计时器，停止运行");
                    Step::Stalled
                }
            };
        };

        let delta = deadline.saturating_sub(self.session.now());
        if self.realtime && delta > 0 {
            thread::sleep(Duration::from_millis(delta));
        }
        self.session.advance_clock(delta);
        Step::ClockAdvanced(delta)
    }

    /// 记录新进场/开始退场的元素
    fn observe_stage(&mut self) {
        let Some(state) = self.session.state() else {
            return;
        };
        let stage = &state.stage_state;

        let mut entries: Vec<(&str, OverlayAction, Option<TransitionKind>, Rect)> = Vec::new();
        entries.extend(
            stage
                .text_overlays
                .iter()
                .map(|o| (o.id.as_str(), o.action, o.transition, o.rect)),
        );
        entries.extend(
            stage
                .image_overlays
                .iter()
                .map(|o| (o.id.as_str(), o.action, o.transition, o.rect)),
        );
        entries.extend(
            stage
                .button_overlays
                .iter()
                .map(|o| (o.id.as_str(), o.action, o.transition, o.rect)),
        );
        entries.extend(
            stage
                .characters
                .values()
                .map(|c| (c.character_id.as_str(), c.action, c.transition, Rect::default())),
        );

        for (id, action, transition, rect) in &entries {
            if self.phases.phase(id, *action) == RenderPhase::Initial {
                let pose = pose_for(*transition, *action, RenderPhase::Initial, rect);
                debug!(id = %id, ?action, ?transition, opacity = pose.opacity, "元素进入渲染");
            }
        }
        self.phases.tick();
        self.phases.retain_live(entries.iter().map(|(id, ..)| *id));
    }

    fn drain_effects(&mut self) {
        if let Some(flash) = self.session.consume_flash() {
            debug!(color = %flash.color, duration = flash.duration, "闪屏");
        }
        if let Some(shake) = self.session.consume_screen_effect() {
            debug!(intensity = shake.intensity, duration = shake.duration, "震屏");
        }
    }

    /// 保存到指定槽位
    pub fn save_to_slot(&self, manager: &SaveManager, slot: u32) -> HostResult<()> {
        let name = self.session.current_scene_name().unwrap_or_default();
        let save = self.session.save(name)?;
        manager.save(slot, &save)
    }

    /// 从指定槽位读档
    pub fn load_from_slot(&mut self, manager: &SaveManager, slot: u32) -> HostResult<()> {
        let save = manager.load(slot)?;
        self.session.load(save)?;
        Ok(())
    }
}
