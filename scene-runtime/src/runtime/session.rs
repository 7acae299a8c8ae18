//! # Session 模块
//!
//! 一次游玩的调度核心。
//!
//! ## 推进协议
//!
//! ```text
//! advance():
//!   1. 阻塞闸门：等待输入 / 过渡中 / 有选项 -> 直接返回
//!   2. 取 current_index 处的指令；序列耗尽时弹出调用栈，栈空则结束
//!   3. current_index += 1，派发给处理器
//!   4. 应用处理器返回的补丁
//!   5. advance = true 继续循环；否则登记 delay + callback 并返回
//! ```
//!
//! 循环代替递归，零时长指令可以连续执行而不增加调用深度。
//!
//! 除阻塞闸门外，下列情况也不会派发新指令：
//! - 当前指令登记的后续计时器尚未触发
//! - 停在时长为 0 的等待点击上（只有 [`GameSession::click`] 能解除）
//! - 处于暂停或 UI 界面（`mode != Playing`）
//!
//! ## 计时器与取消
//!
//! 进入新场景（跳转、调用、返回、开始、读档）与重置会取消全部计时器，
//! 并结束所有停在退场动画中的元素，过期回调不会修改新场景的状态。
//! 会话为 `None` 时到期的计时器不做任何事。

use tracing::{debug, info, warn};

use crate::command::{ChoiceTarget, Command, CommandKind, SetVariableCommand};
use crate::config::PlayerConfig;
use crate::error::{PlayerError, PlayerResult, SaveError};
use crate::history::{History, HistoryEvent};
use crate::project::{AssetResolver, Project, SilentSoundPlayer, SoundPlayer};
use crate::runtime::button::{ButtonStep, plan_actions};
use crate::runtime::dispatcher::dispatch;
use crate::runtime::handlers::HandlerContext;
use crate::runtime::handlers::flow::{apply_set_variable, find_label};
use crate::runtime::result::{Continuation, HandlerResult, Navigation, StatePatch};
use crate::runtime::scheduler::{Scheduler, Timer, TimerHandle};
use crate::save::{GameStateSave, PlayerStateData};
use crate::state::{
    CommandFrame, FlashEffect, PlayerMode, PlayerState, PlayerStatus, ScreenEffect, UiState,
    VarValue,
};
use crate::transition::OverlayAction;

/// 游戏会话
///
/// 持有工程、协作者、计时器队列与玩家状态。玩家状态只在这里被修改。
///
/// # 使用示例
///
/// ```ignore
/// let mut session = GameSession::new(project, PlayerConfig::default());
/// session.start("opening")?;
///
/// loop {
///     match session.status() {
///         PlayerStatus::Blocked => { /* 展示对话/选项，收集输入 */ }
///         PlayerStatus::Running => session.advance_clock(16),
///         PlayerStatus::Finished | PlayerStatus::Idle => break,
///     }
/// }
/// ```
pub struct GameSession {
    project: Project,
    config: PlayerConfig,
    /// 为 None 时由工程自身解析资源
    assets: Option<Box<dyn AssetResolver>>,
    sound: Box<dyn SoundPlayer>,
    scheduler: Scheduler,
    state: Option<PlayerState>,
    /// 当前指令登记的后续动作
    pending: Option<Pending>,
}

/// 阻止推进的后续动作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    /// 等待计时器触发
    Timer(TimerHandle),
    /// 只等待玩家点击，不登记计时器
    Click,
}

impl GameSession {
    pub fn new(project: Project, config: PlayerConfig) -> Self {
        Self {
            project,
            config,
            assets: None,
            sound: Box::new(SilentSoundPlayer),
            scheduler: Scheduler::new(),
            state: None,
            pending: None,
        }
    }

    /// 使用外部资源解析器
    pub fn with_asset_resolver(mut self, assets: Box<dyn AssetResolver>) -> Self {
        self.assets = Some(assets);
        self
    }

    /// 使用外部音效播放器
    pub fn with_sound_player(mut self, sound: Box<dyn SoundPlayer>) -> Self {
        self.sound = sound;
        self
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn state(&self) -> Option<&PlayerState> {
        self.state.as_ref()
    }

    /// 当前虚拟时间（毫秒）
    pub fn now(&self) -> u64 {
        self.scheduler.now()
    }

    /// 最早的计时器到期时间
    pub fn next_deadline(&self) -> Option<u64> {
        self.scheduler.next_deadline()
    }

    pub fn pending_timers(&self) -> usize {
        self.scheduler.pending()
    }

    /// 调度状态
    pub fn status(&self) -> PlayerStatus {
        let Some(state) = &self.state else {
            return PlayerStatus::Idle;
        };
        if state.mode != PlayerMode::Playing
            || state.ui_state.is_blocking()
            || self.pending == Some(Pending::Click)
        {
            PlayerStatus::Blocked
        } else if self.pending.is_none() && state.is_exhausted() {
            PlayerStatus::Finished
        } else {
            PlayerStatus::Running
        }
    }

    /// 是否停在只能由点击结束的等待上
    pub fn is_awaiting_click(&self) -> bool {
        self.pending == Some(Pending::Click)
    }

    fn context(&self) -> HandlerContext<'_> {
        HandlerContext {
            project: &self.project,
            assets: match &self.assets {
                Some(assets) => assets.as_ref(),
                None => &self.project as &dyn AssetResolver,
            },
            sound: self.sound.as_ref(),
            config: &self.config,
        }
    }

    fn state_ref(&self) -> PlayerResult<&PlayerState> {
        self.state.as_ref().ok_or(PlayerError::NoSession)
    }

    fn state_mut(&mut self) -> PlayerResult<&mut PlayerState> {
        self.state.as_mut().ok_or(PlayerError::NoSession)
    }

    // ========== 生命周期 ==========

    /// 从指定场景开头开始新的游玩
    pub fn start(&mut self, scene_id: &str) -> PlayerResult<()> {
        let scene = self
            .project
            .scene(scene_id)
            .ok_or_else(|| PlayerError::SceneNotFound {
                scene_id: scene_id.to_string(),
            })?;

        let mut state = PlayerState::new(scene.id.clone(), scene.commands.clone());
        state.variables = self.project.initial_variables();
        state.history = History::new().with_max_events(self.config.history_limit);

        self.cancel_timers();
        self.state = Some(state);
        info!(scene_id = %scene_id, "开始游玩");
        self.advance();
        Ok(())
    }

    /// 结束会话并取消全部计时器
    pub fn reset(&mut self) {
        self.cancel_timers();
        self.state = None;
        debug!("会话已重置");
    }

    fn cancel_timers(&mut self) {
        self.scheduler.cancel_all();
        self.pending = None;
    }

    // ========== 推进 ==========

    fn can_advance(&self, state: &PlayerState) -> bool {
        state.mode == PlayerMode::Playing
            && !state.ui_state.is_blocking()
            && self.pending.is_none()
    }

    /// 推进指令直到阻塞、等待计时器或结束
    pub fn advance(&mut self) {
        loop {
            let Some(state) = &self.state else {
                return;
            };
            if !self.can_advance(state) {
                return;
            }

            let Some(command) = state.current_command().cloned() else {
                if self.resume_caller() {
                    continue;
                }
                return;
            };

            if let Some(state) = self.state.as_mut() {
                state.current_index += 1;
            }
            let result = match &self.state {
                Some(state) => dispatch(&command, state, &self.context()),
                None => return,
            };

            if !self.apply_result(&command, result) {
                return;
            }
        }
    }

    /// 应用处理器结果，返回是否继续循环
    fn apply_result(&mut self, command: &Command, result: HandlerResult) -> bool {
        if let Some(patch) = result.updates {
            if let Some(navigation) = self.apply_patch(patch) {
                self.navigate(navigation);
            }
        }

        if result.advance {
            return true;
        }

        if let Some(callback) = result.callback {
            if callback == Continuation::AwaitClick {
                self.pending = Some(Pending::Click);
                return false;
            }
            let handle = self
                .scheduler
                .schedule(command.id.clone(), result.delay, callback);
            self.pending = Some(Pending::Timer(handle));
            return false;
        }

        let blocked = self
            .state
            .as_ref()
            .is_some_and(|s| s.ui_state.is_blocking());
        if !blocked {
            // 既不推进也不阻塞会让循环永远停住
            warn!(command_id = %command.id, kind = command.kind.name(), "指令未推进也未阻塞，继续执行");
        }
        !blocked
    }

    fn apply_patch(&mut self, patch: StatePatch) -> Option<Navigation> {
        let state = self.state.as_mut()?;
        if let Some(stage) = patch.stage {
            state.stage_state = stage;
        }
        if let Some(ui) = patch.ui {
            state.ui_state = ui;
        }
        if let Some(music) = patch.music {
            state.music_state = music;
        }
        if let Some(variables) = patch.variables {
            state.variables = variables;
        }
        if let Some(event) = patch.history {
            state.history.push(event);
        }
        patch.navigation
    }

    fn navigate(&mut self, navigation: Navigation) {
        match navigation {
            Navigation::Goto(index) => {
                if let Some(state) = self.state.as_mut() {
                    state.current_index = index.min(state.current_commands.len());
                }
            }
            Navigation::JumpToScene { scene_id } => {
                self.enter_scene_by_id(&scene_id);
            }
            Navigation::CallScene { scene_id } => {
                let Some(state) = self.state.as_ref() else {
                    return;
                };
                let frame = CommandFrame {
                    scene_id: state.current_scene_id.clone(),
                    commands: state.current_commands.clone(),
                    index: state.current_index,
                };
                if self.enter_scene_by_id(&scene_id) {
                    if let Some(state) = self.state.as_mut() {
                        state.command_stack.push(frame);
                    }
                }
            }
            Navigation::Return => {
                if !self.resume_caller() {
                    // 调用栈为空：播放结束
                    if let Some(state) = self.state.as_mut() {
                        state.current_index = state.current_commands.len();
                    }
                }
            }
        }
    }

    /// 弹出一层调用栈并回到调用处
    fn resume_caller(&mut self) -> bool {
        let Some(frame) = self.state.as_mut().and_then(|s| s.command_stack.pop()) else {
            return false;
        };
        debug!(scene_id = %frame.scene_id, index = frame.index, "返回调用场景");
        self.enter_scene(frame.scene_id, frame.commands, frame.index);
        true
    }

    fn enter_scene_by_id(&mut self, scene_id: &str) -> bool {
        let Some(scene) = self.project.scene(scene_id) else {
            warn!(scene_id = %scene_id, "目标场景不存在，继续执行");
            return false;
        };
        let commands = scene.commands.clone();
        debug!(scene_id = %scene_id, "进入场景");
        self.enter_scene(scene_id.to_string(), commands, 0);
        true
    }

    /// 切换指令序列：取消全部计时器，结束退场动画，清除交互提示
    fn enter_scene(&mut self, scene_id: String, commands: Vec<Command>, index: usize) {
        self.cancel_timers();
        let Some(state) = self.state.as_mut() else {
            return;
        };
        state.current_scene_id = scene_id;
        state.current_index = index.min(commands.len());
        state.current_commands = commands;
        state.stage_state.finalize_exits();
        clear_prompts(&mut state.ui_state);
    }

    // ========== 时间 ==========

    /// 推动虚拟时钟，按到期顺序触发计时器
    ///
    /// 暂停或处于 UI 界面时时钟冻结。
    pub fn advance_clock(&mut self, ms: u64) {
        let target = self.scheduler.now().saturating_add(ms);
        loop {
            if self.clock_frozen() {
                return;
            }
            match self.scheduler.pop_due(target) {
                Some(timer) => self.fire(timer),
                None => break,
            }
        }
        self.scheduler.set_now(target);
    }

    fn clock_frozen(&self) -> bool {
        self.state
            .as_ref()
            .is_some_and(|s| s.mode != PlayerMode::Playing)
    }

    fn fire(&mut self, timer: Timer) {
        if self.pending == Some(Pending::Timer(timer.handle)) {
            self.pending = None;
        }
        let Some(state) = self.state.as_mut() else {
            return;
        };
        debug!(owner = %timer.owner, continuation = ?timer.continuation, at = timer.deadline, "计时器触发");

        match timer.continuation {
            Continuation::Advance | Continuation::EndWait { .. } | Continuation::AwaitClick => {}
            Continuation::EndTransition => state.ui_state.is_transitioning = false,
            Continuation::RemoveOverlay { kind, id } => {
                state.stage_state.remove_overlay(kind, &id);
            }
            Continuation::RemoveCharacter { id } => {
                state.stage_state.characters.remove(&id);
            }
            Continuation::BlockForButton { id } => {
                if state.stage_state.button(&id).is_some() {
                    state.ui_state.is_waiting_for_input = true;
                    state.ui_state.waiting_button_id = Some(id);
                    return;
                }
                warn!(button_id = %id, "等待点击的按钮已不存在，继续执行");
            }
        }
        self.advance();
    }

    // ========== 阻塞解除事件 ==========

    /// 对话已读完
    pub fn finish_dialogue(&mut self) -> PlayerResult<()> {
        let state = self.state_mut()?;
        if state.ui_state.dialogue.take().is_none() {
            return Err(PlayerError::NotAwaiting {
                expected: "dialogue",
            });
        }
        state.ui_state.is_waiting_for_input = false;
        self.advance();
        Ok(())
    }

    /// 选择选项（`index` 为展示列表中的位置）
    pub fn select_choice(&mut self, index: usize) -> PlayerResult<()> {
        let state = self.state_mut()?;
        let Some(set) = state.ui_state.choices.as_ref() else {
            return Err(PlayerError::NotAwaiting { expected: "choice" });
        };
        let Some(view) = set.options.get(index) else {
            return Err(PlayerError::InvalidChoiceIndex {
                index,
                max: set.options.len(),
            });
        };

        let option_index = view.option_index;
        let texts: Vec<String> = set.options.iter().map(|o| o.text.clone()).collect();
        let target = state
            .current_commands
            .iter()
            .find(|c| c.id == set.command_id)
            .and_then(|c| match &c.kind {
                CommandKind::Choice(choice) => choice.options.get(option_index),
                _ => None,
            })
            .map(|option| option.target.clone())
            .unwrap_or_default();

        state.history.push(HistoryEvent::choice_made(texts, index));
        state.ui_state.choices = None;

        let navigation = match target {
            ChoiceTarget::Continue => None,
            ChoiceTarget::Scene { scene_id } => Some(Navigation::JumpToScene { scene_id }),
            ChoiceTarget::Label { label } => match find_label(&state.current_commands, &label) {
                Some(index) => Some(Navigation::Goto(index)),
                None => {
                    warn!(label = %label, "选项目标标签不存在，继续执行");
                    None
                }
            },
        };
        if let Some(navigation) = navigation {
            self.navigate(navigation);
        }
        self.advance();
        Ok(())
    }

    /// 提交文本输入
    pub fn submit_text_input(&mut self, value: &str) -> PlayerResult<()> {
        let state = self.state_mut()?;
        let Some(request) = state.ui_state.text_input.take() else {
            return Err(PlayerError::NotAwaiting {
                expected: "textInput",
            });
        };

        let value: String = match request.max_length {
            Some(max) => value.chars().take(max).collect(),
            None => value.to_string(),
        };
        state
            .variables
            .insert(request.variable_id, VarValue::String(value.clone()));
        state
            .history
            .push(HistoryEvent::text_input(request.prompt, value));
        state.ui_state.is_waiting_for_input = false;
        self.advance();
        Ok(())
    }

    /// 视频播放结束（或被跳过）
    pub fn finish_movie(&mut self) -> PlayerResult<()> {
        let state = self.state_mut()?;
        if state.ui_state.movie_url.take().is_none() {
            return Err(PlayerError::NotAwaiting { expected: "movie" });
        }
        state.ui_state.is_waiting_for_input = false;
        self.advance();
        Ok(())
    }

    /// 玩家点击画面
    ///
    /// 有对话时结束对话；否则结束等待点击的 `wait`，或提前结束可跳过的等待。
    /// 返回点击是否被处理。
    pub fn click(&mut self) -> PlayerResult<bool> {
        let state = self.state_ref()?;
        if state.mode != PlayerMode::Playing {
            return Ok(false);
        }
        if state.ui_state.dialogue.is_some() {
            self.finish_dialogue()?;
            return Ok(true);
        }

        match self.pending {
            Some(Pending::Click) => debug!("点击结束等待"),
            Some(Pending::Timer(handle)) => {
                let Some(timer) = self.scheduler.get(handle) else {
                    return Ok(false);
                };
                if !matches!(timer.continuation, Continuation::EndWait { skippable: true }) {
                    return Ok(false);
                }
                debug!(owner = %timer.owner, "点击跳过等待");
                self.scheduler.cancel(handle);
            }
            None => return Ok(false),
        }

        self.pending = None;
        self.advance();
        Ok(true)
    }

    /// 点击按钮覆盖层，返回点击是否被处理
    pub fn click_button(&mut self, button_id: &str) -> PlayerResult<bool> {
        let state = self.state_ref()?;
        if state.mode != PlayerMode::Playing {
            return Ok(false);
        }
        let Some(button) = state
            .stage_state
            .button(button_id)
            .filter(|b| b.action == OverlayAction::Show)
            .cloned()
        else {
            debug!(button_id = %button_id, "按钮不存在或正在退场，忽略点击");
            return Ok(false);
        };
        // 等待点击的按钮只在持有阻塞标记时响应，重复点击被吸收
        if button.wait_for_click && state.ui_state.waiting_button_id.as_deref() != Some(button_id) {
            debug!(button_id = %button_id, "按钮未处于等待状态，忽略点击");
            return Ok(false);
        }

        if let Some(sound_id) = button.click_sound_id.as_deref() {
            self.context().play_sound(Some(sound_id));
        }

        let mut navigated = false;
        for step in plan_actions(&button.actions) {
            if navigated {
                warn!(button_id = %button_id, "跳转之后的按钮动作被忽略");
                break;
            }
            match step {
                ButtonStep::Commit(batch) => self.commit_variables(&batch),
                ButtonStep::PlaySound { asset_id } => {
                    self.context().play_sound(Some(&asset_id));
                }
                ButtonStep::JumpToScene { scene_id } => {
                    navigated = self.enter_scene_by_id(&scene_id);
                }
                ButtonStep::JumpToLabel { label } => {
                    navigated = self.jump_to_label_now(&label);
                }
            }
        }

        if navigated {
            self.advance();
        } else if button.wait_for_click {
            if let Some(state) = self.state.as_mut() {
                state.ui_state.waiting_button_id = None;
                state.ui_state.is_waiting_for_input = false;
            }
            self.advance();
        }
        Ok(true)
    }

    /// 按钮触发的场景内跳转，与进入新场景一样取消计时器
    fn jump_to_label_now(&mut self, label: &str) -> bool {
        let Some(state) = self.state.as_ref() else {
            return false;
        };
        let Some(index) = find_label(&state.current_commands, label) else {
            warn!(label = %label, "按钮目标标签不存在");
            return false;
        };
        let scene_id = state.current_scene_id.clone();
        let commands = state.current_commands.clone();
        self.enter_scene(scene_id, commands, index);
        true
    }

    /// 一次性提交一批变量写入
    fn commit_variables(&mut self, batch: &[SetVariableCommand]) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        let mut variables = state.variables.clone();
        for set in batch {
            if !apply_set_variable(set, &mut variables, &self.project) {
                warn!(variable_id = %set.variable_id, operation = ?set.operation, "变量运算无效，保持原值");
            }
        }
        state.variables = variables;
    }

    // ========== 模式与 UI ==========

    pub fn pause(&mut self) -> PlayerResult<()> {
        let state = self.state_mut()?;
        if state.mode == PlayerMode::Playing {
            state.mode = PlayerMode::Paused;
        }
        Ok(())
    }

    pub fn resume(&mut self) -> PlayerResult<()> {
        let state = self.state_mut()?;
        if state.mode == PlayerMode::Paused {
            state.mode = PlayerMode::Playing;
            self.advance();
        }
        Ok(())
    }

    /// 切换历史记录面板，返回新的显示状态
    pub fn toggle_history(&mut self) -> PlayerResult<bool> {
        let ui = &mut self.state_mut()?.ui_state;
        ui.show_history = !ui.show_history;
        Ok(ui.show_history)
    }

    /// 取走待播放的闪屏
    pub fn consume_flash(&mut self) -> Option<FlashEffect> {
        self.state.as_mut()?.ui_state.pending_flash.take()
    }

    /// 取走待播放的震屏
    pub fn consume_screen_effect(&mut self) -> Option<ScreenEffect> {
        self.state.as_mut()?.stage_state.screen_effect.take()
    }

    /// 打开 UI 界面，记录返回场景
    pub fn open_screen(&mut self, screen_id: &str) -> PlayerResult<()> {
        if self.project.screen(screen_id).is_none() {
            return Err(PlayerError::ScreenNotFound {
                screen_id: screen_id.to_string(),
            });
        }
        let state = self.state_mut()?;
        state.ui_state.screen_return_scene_id = Some(state.current_scene_id.clone());
        state.ui_state.active_screen = Some(screen_id.to_string());
        state.mode = PlayerMode::Menu;
        Ok(())
    }

    /// 关闭 UI 界面并继续游玩，返回打开界面时所在的场景
    pub fn close_screen(&mut self) -> PlayerResult<Option<String>> {
        let state = self.state_mut()?;
        if state.ui_state.active_screen.take().is_none() {
            return Err(PlayerError::NotAwaiting { expected: "screen" });
        }
        let return_scene = state.ui_state.screen_return_scene_id.take();
        state.mode = PlayerMode::Playing;
        self.advance();
        Ok(return_scene)
    }

    // ========== 存档 ==========

    /// 当前场景的显示名（未命名时使用 id）
    pub fn current_scene_name(&self) -> Option<String> {
        let state = self.state.as_ref()?;
        let name = self
            .project
            .scene(&state.current_scene_id)
            .map(|s| s.name.clone())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| state.current_scene_id.clone());
        Some(name)
    }

    pub fn save(&self, scene_name: impl Into<String>) -> PlayerResult<GameStateSave> {
        let state = self.state_ref()?;
        Ok(GameStateSave::new(scene_name, PlayerStateData::capture(state)))
    }

    /// 读档：恢复持久状态，临时状态重置，然后继续推进
    pub fn load(&mut self, save: GameStateSave) -> PlayerResult<()> {
        let scene_id = &save.player_state_data.current_scene_id;
        if self.project.scene(scene_id).is_none() {
            return Err(SaveError::UnknownScene(scene_id.clone()).into());
        }

        let mut state = save.player_state_data.restore();
        state.history = History::new().with_max_events(self.config.history_limit);
        state.stage_state.finalize_exits();

        self.cancel_timers();
        info!(scene_id = %state.current_scene_id, index = state.current_index, "读取存档");
        self.state = Some(state);
        self.advance();
        Ok(())
    }
}

/// 清除交互提示与阻塞标记
fn clear_prompts(ui: &mut UiState) {
    ui.dialogue = None;
    ui.choices = None;
    ui.text_input = None;
    ui.movie_url = None;
    ui.is_waiting_for_input = false;
    ui.is_transitioning = false;
    ui.waiting_button_id = None;
}
