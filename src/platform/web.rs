//! Browser platform: LocalStorage, DOM rendering, `setInterval` ticks and
//! `window.confirm`

use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, HtmlButtonElement, HtmlInputElement, Storage, Window};

use crate::error::{Result, StoreError};
use crate::format::{TimeParts, format_time, format_time_short};
use crate::persistence::StorageBackend;
use crate::present::{Confirm, HeaderView, NoticeKind, Notify, StopwatchView, TaskView};
use crate::stopwatch::{LapLedger, StopwatchState, TickScheduler, TickTimer};
use crate::tasks::{Task, TaskStats};

const TOAST_MS: i32 = 3000;

fn js_error(value: &JsValue) -> String {
    value
        .dyn_ref::<js_sys::Error>()
        .map(|e| String::from(e.message()))
        .or_else(|| value.as_string())
        .unwrap_or_else(|| format!("{:?}", value))
}

// ============================================================================
// Storage
// ============================================================================

/// `window.localStorage`
pub struct LocalStorageBackend {
    storage: Storage,
}

impl LocalStorageBackend {
    pub fn open() -> Result<Self> {
        let window = web_sys::window()
            .ok_or_else(|| StoreError::StorageUnavailable("no window".to_string()))?;
        let storage = window
            .local_storage()
            .map_err(|e| StoreError::StorageUnavailable(js_error(&e)))?
            .ok_or_else(|| StoreError::StorageUnavailable("localStorage disabled".to_string()))?;
        Ok(Self { storage })
    }

    fn map_write_error(key: &str, err: JsValue) -> StoreError {
        let quota = err
            .dyn_ref::<web_sys::DomException>()
            .map(|e| {
                let name = e.name();
                name == "QuotaExceededError" || name == "NS_ERROR_DOM_QUOTA_REACHED"
            })
            .unwrap_or(false);
        if quota {
            StoreError::QuotaExceeded {
                key: key.to_string(),
            }
        } else {
            StoreError::StorageUnavailable(js_error(&err))
        }
    }
}

impl StorageBackend for LocalStorageBackend {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        self.storage
            .get_item(key)
            .map_err(|e| StoreError::StorageUnavailable(js_error(&e)))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.storage
            .set_item(key, value)
            .map_err(|e| Self::map_write_error(key, e))
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.storage
            .remove_item(key)
            .map_err(|e| StoreError::StorageUnavailable(js_error(&e)))
    }

    fn keys(&self) -> Result<Vec<String>> {
        let len = self
            .storage
            .length()
            .map_err(|e| StoreError::StorageUnavailable(js_error(&e)))?;
        let mut keys = Vec::with_capacity(len as usize);
        for i in 0..len {
            if let Ok(Some(key)) = self.storage.key(i) {
                keys.push(key);
            }
        }
        Ok(keys)
    }
}

// ============================================================================
// Ticks
// ============================================================================

/// Schedules `on_tick` with `setInterval`; dropping the handle clears it
pub struct IntervalScheduler {
    on_tick: Rc<dyn Fn()>,
}

impl IntervalScheduler {
    pub fn new(on_tick: impl Fn() + 'static) -> Self {
        Self {
            on_tick: Rc::new(on_tick),
        }
    }
}

impl TickScheduler for IntervalScheduler {
    fn schedule(&mut self, interval_ms: u32) -> TickTimer {
        let Some(window) = web_sys::window() else {
            log::error!("No window, stopwatch display will not refresh");
            return TickTimer::inert(0);
        };

        let on_tick = self.on_tick.clone();
        let closure = Closure::<dyn FnMut()>::new(move || (*on_tick)());
        let handle = match window.set_interval_with_callback_and_timeout_and_arguments_0(
            closure.as_ref().unchecked_ref(),
            interval_ms as i32,
        ) {
            Ok(handle) => handle,
            Err(e) => {
                log::error!("setInterval failed: {}", js_error(&e));
                return TickTimer::inert(0);
            }
        };

        TickTimer::new(handle as u64, move || {
            window.clear_interval_with_handle(handle);
            // The callback must outlive the interval
            drop(closure);
        })
    }
}

// ============================================================================
// Confirmation
// ============================================================================

/// `window.confirm`; a dialog that cannot be shown counts as "no"
#[derive(Debug, Clone, Copy, Default)]
pub struct DialogConfirm;

impl Confirm for DialogConfirm {
    fn confirm(&mut self, prompt: &str) -> bool {
        web_sys::window()
            .and_then(|w| w.confirm_with_message(prompt).ok())
            .unwrap_or(false)
    }
}

// ============================================================================
// DOM view
// ============================================================================

/// Renders into the widget page by element id
#[derive(Clone)]
pub struct DomView {
    window: Window,
    document: Document,
    notifications: bool,
}

impl DomView {
    pub fn new(notifications: bool) -> Option<Self> {
        let window = web_sys::window()?;
        let document = window.document()?;
        Some(Self {
            window,
            document,
            notifications,
        })
    }

    fn by_id(&self, id: &str) -> Option<Element> {
        self.document.get_element_by_id(id)
    }

    fn set_text(&self, id: &str, text: &str) {
        if let Some(el) = self.by_id(id) {
            el.set_text_content(Some(text));
        }
    }

    fn set_disabled(&self, id: &str, disabled: bool) {
        if let Some(btn) = self
            .by_id(id)
            .and_then(|el| el.dyn_into::<HtmlButtonElement>().ok())
        {
            btn.set_disabled(disabled);
        }
    }

    fn element(&self, tag: &str, class: &str) -> Option<Element> {
        let el = self.document.create_element(tag).ok()?;
        el.set_class_name(class);
        Some(el)
    }

    fn lap_item(&self, laps: &LapLedger, index: usize) -> Option<Element> {
        let lap = laps.get(index)?;
        let li = self.element("li", "lap-item")?;

        let number = self.element("span", "lap-number")?;
        number.set_text_content(Some(&format!("Lap {}", lap.sequence_number)));
        li.append_child(&number).ok()?;

        let time = self.element("span", "lap-time")?;
        time.set_text_content(Some(&format_time(lap.elapsed_at_capture)));
        li.append_child(&time).ok()?;

        if let Some(delta) = laps.delta(index) {
            let class = if delta.faster {
                "lap-diff faster"
            } else {
                "lap-diff slower"
            };
            let diff = self.element("span", class)?;
            let sign = if delta.faster { '-' } else { '+' };
            diff.set_text_content(Some(&format!(
                "{}{}",
                sign,
                format_time_short(delta.absolute_difference)
            )));
            li.append_child(&diff).ok()?;
        }
        Some(li)
    }

    fn task_item(&self, task: &Task) -> Option<Element> {
        let class = if task.completed {
            "task-item completed"
        } else {
            "task-item"
        };
        let li = self.element("li", class)?;
        li.set_attribute("data-id", &task.id).ok()?;

        let checkbox = self
            .element("input", "task-checkbox")?
            .dyn_into::<HtmlInputElement>()
            .ok()?;
        checkbox.set_type("checkbox");
        checkbox.set_checked(task.completed);
        li.append_child(&checkbox).ok()?;

        let text = self.element("span", "task-text")?;
        text.set_text_content(Some(&task.text));
        li.append_child(&text).ok()?;

        let delete = self.element("button", "delete-task-btn")?;
        delete.set_text_content(Some("\u{d7}"));
        delete.set_attribute("aria-label", "Delete task").ok()?;
        li.append_child(&delete).ok()?;
        Some(li)
    }
}

impl Notify for DomView {
    fn notify(&mut self, message: &str, kind: NoticeKind) {
        log::info!("[{}] {}", kind.as_str(), message);
        if !self.notifications {
            return;
        }
        let Some(body) = self.document.body() else {
            return;
        };
        let Some(toast) = self.element("div", &format!("toast toast-{}", kind.as_str())) else {
            return;
        };
        toast.set_text_content(Some(message));
        if body.append_child(&toast).is_err() {
            return;
        }

        let remove = Closure::once_into_js(move || toast.remove());
        let _ = self
            .window
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                remove.unchecked_ref(),
                TOAST_MS,
            );
    }
}

impl StopwatchView for DomView {
    fn render(&mut self, state: &StopwatchState) {
        let parts = TimeParts::from_ms(state.elapsed_ms);
        self.set_text("hours", &format!("{:02}", parts.hours));
        self.set_text("minutes", &format!("{:02}", parts.minutes));
        self.set_text("seconds", &format!("{:02}", parts.seconds));
        self.set_text("milliseconds", &format!("{:03}", parts.millis));
    }

    fn render_laps(&mut self, laps: &LapLedger) {
        let Some(list) = self.by_id("lap-list") else {
            return;
        };
        list.set_inner_html("");
        for index in 0..laps.len() {
            if let Some(li) = self.lap_item(laps, index) {
                let _ = list.append_child(&li);
            }
        }
    }

    fn update_control_availability(&mut self, running: bool, elapsed_ms: u64) {
        self.set_disabled("start-btn", running);
        self.set_disabled("pause-btn", !running);
        self.set_disabled("lap-btn", elapsed_ms == 0);
        if let Ok(Some(column)) = self.document.query_selector(".timer-column") {
            let _ = column
                .class_list()
                .toggle_with_force("timer-running", running);
        }
    }
}

impl HeaderView for DomView {
    fn render_date(&mut self, label: &str) {
        self.set_text("current-date", label);
    }
}

impl TaskView for DomView {
    fn render_tasks(&mut self, tasks: &[Task], stats: TaskStats) {
        if let Some(list) = self.by_id("task-list") {
            list.set_inner_html("");
            if tasks.is_empty() {
                if let Some(empty) = self.element("li", "empty-state") {
                    empty.set_text_content(Some("No tasks yet. Add one to get started!"));
                    let _ = list.append_child(&empty);
                }
            }
            for task in tasks {
                if let Some(li) = self.task_item(task) {
                    let _ = list.append_child(&li);
                }
            }
        }
        self.set_text("total-tasks", &stats.total.to_string());
        self.set_text("completed-tasks", &stats.completed.to_string());
    }
}
