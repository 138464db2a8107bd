//! Daily Productivity entry point
//!
//! In the browser this wires the widget to the page. Natively it is a small
//! CLI over a JSON file store.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_app {
    use std::cell::RefCell;
    use std::rc::{Rc, Weak};

    use wasm_bindgen::JsCast;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen_futures::JsFuture;
    use web_sys::{Document, Element, HtmlAnchorElement, HtmlInputElement, KeyboardEvent};

    use daily_productivity::app::{Ports, Widget};
    use daily_productivity::persistence::Store;
    use daily_productivity::platform::web::{
        DialogConfirm, DomView, IntervalScheduler, LocalStorageBackend,
    };
    use daily_productivity::platform::{Clock, SystemClock};
    use daily_productivity::present::{NoticeKind, Notify};
    use daily_productivity::settings::Preferences;

    type Shared = Rc<RefCell<Widget>>;

    pub fn run() {
        console_error_panic_hook::set_once();
        let _ = console_log::init_with_level(log::Level::Info);
        log::info!("{} starting", daily_productivity::consts::APP_NAME);

        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            log::error!("No document to render into");
            return;
        };

        let clock: Rc<dyn Clock> = Rc::new(SystemClock);
        let store = match LocalStorageBackend::open() {
            Ok(backend) => Store::open(Box::new(backend), clock.clone()),
            Err(e) => {
                log::warn!("Storage unavailable, data will not be saved: {}", e);
                Store::memory_only(clock.clone())
            }
        };
        let store = Rc::new(store);
        let prefs = Preferences::load(&store);
        let Some(view) = DomView::new(prefs.notifications) else {
            log::error!("Could not attach to the page");
            return;
        };
        if store.is_memory_only() {
            view.clone()
                .notify("Storage unavailable: data will not be saved", NoticeKind::Error);
        }

        let widget: Shared = Rc::new_cyclic(|weak: &Weak<RefCell<Widget>>| {
            let weak = weak.clone();
            let scheduler = IntervalScheduler::new(move || {
                if let Some(widget) = weak.upgrade() {
                    if let Ok(mut widget) = widget.try_borrow_mut() {
                        widget.stopwatch_mut().tick();
                    }
                }
            });
            RefCell::new(Widget::new(
                store,
                clock,
                Ports {
                    scheduler: Box::new(scheduler),
                    stopwatch_view: Box::new(view.clone()),
                    task_view: Box::new(view.clone()),
                    header: Box::new(view.clone()),
                    notices: Box::new(view.clone()),
                    confirm: Box::new(DialogConfirm),
                },
            ))
        });

        setup_stopwatch_controls(&document, &widget);
        setup_task_controls(&document, &widget);
        setup_data_controls(&document, &widget);
        setup_keyboard(&document, &widget);
        setup_lifecycle(&document, &widget);
        schedule_date_refresh(&widget);
        log::info!("Widget initialized");
    }

    /// Refresh the header date at the next local midnight, then re-arm
    fn schedule_date_refresh(widget: &Shared) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let delay = widget.borrow().ms_until_midnight().clamp(1, i64::from(i32::MAX));
        let w = widget.clone();
        let callback = Closure::once_into_js(move || {
            w.borrow_mut().refresh_date();
            schedule_date_refresh(&w);
        });
        let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(
            callback.unchecked_ref(),
            delay as i32,
        );
    }

    fn on_click(document: &Document, id: &str, mut handler: impl FnMut() + 'static) {
        let Some(el) = document.get_element_by_id(id) else {
            log::warn!("Missing #{}", id);
            return;
        };
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::MouseEvent| handler());
        let _ = el.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn setup_stopwatch_controls(document: &Document, widget: &Shared) {
        let w = widget.clone();
        on_click(document, "start-btn", move || w.borrow_mut().stopwatch_mut().start());
        let w = widget.clone();
        on_click(document, "pause-btn", move || w.borrow_mut().stopwatch_mut().pause());
        let w = widget.clone();
        on_click(document, "reset-btn", move || {
            w.borrow_mut().reset_stopwatch();
        });
        let w = widget.clone();
        on_click(document, "lap-btn", move || {
            w.borrow_mut().stopwatch_mut().record_lap();
        });
        let w = widget.clone();
        on_click(document, "clear-laps-btn", move || {
            w.borrow_mut().clear_laps();
        });
        let w = widget.clone();
        let doc = document.clone();
        on_click(document, "export-laps-btn", move || {
            let text = w.borrow().stopwatch().export_laps_text();
            download(&doc, "laps.txt", &text, "text/plain");
        });
    }

    fn add_task_from_input(document: &Document, widget: &Shared) {
        let Some(input) = document
            .get_element_by_id("task-input")
            .and_then(|el| el.dyn_into::<HtmlInputElement>().ok())
        else {
            return;
        };
        if widget.borrow_mut().tasks_mut().add(&input.value()).is_some() {
            input.set_value("");
        }
        let _ = input.focus();
    }

    fn setup_task_controls(document: &Document, widget: &Shared) {
        {
            let w = widget.clone();
            let doc = document.clone();
            on_click(document, "add-task-btn", move || add_task_from_input(&doc, &w));
        }

        if let Some(input) = document.get_element_by_id("task-input") {
            let w = widget.clone();
            let doc = document.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                if event.key() == "Enter" {
                    add_task_from_input(&doc, &w);
                }
            });
            let _ = input
                .add_event_listener_with_callback("keypress", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        {
            let w = widget.clone();
            on_click(document, "clear-completed-btn", move || {
                w.borrow_mut().clear_completed_tasks();
            });
        }

        // Delegated: items are re-rendered on every change
        if let Some(list) = document.get_element_by_id("task-list") {
            let w = widget.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: web_sys::Event| {
                let Some(target) = event
                    .target()
                    .and_then(|t| t.dyn_into::<Element>().ok())
                else {
                    return;
                };
                let Some(id) = target
                    .closest(".task-item")
                    .ok()
                    .flatten()
                    .and_then(|li| li.get_attribute("data-id"))
                else {
                    return;
                };
                let class = target.class_name();
                if class.contains("task-checkbox") && event.type_() == "change" {
                    w.borrow_mut().tasks_mut().toggle(&id);
                } else if class.contains("delete-task-btn") && event.type_() == "click" {
                    w.borrow_mut().tasks_mut().delete(&id);
                }
            });
            for kind in ["click", "change"] {
                let _ = list.add_event_listener_with_callback(kind, closure.as_ref().unchecked_ref());
            }
            closure.forget();
        }
    }

    fn setup_data_controls(document: &Document, widget: &Shared) {
        {
            let w = widget.clone();
            let doc = document.clone();
            on_click(document, "export-btn", move || {
                let (name, json) = {
                    let mut widget = w.borrow_mut();
                    (widget.backup_file_name(), widget.export_backup())
                };
                match json {
                    Ok(json) => download(&doc, &name, &json, "application/json"),
                    Err(e) => log::error!("Export failed: {}", e),
                }
            });
        }
        {
            let w = widget.clone();
            let doc = document.clone();
            on_click(document, "import-btn", move || pick_backup_file(&doc, &w));
        }
        {
            let w = widget.clone();
            on_click(document, "clear-all-btn", move || {
                w.borrow_mut().clear_all_data();
            });
        }
    }

    /// Open a file picker and import the chosen backup
    fn pick_backup_file(document: &Document, widget: &Shared) {
        let Some(input) = document
            .create_element("input")
            .ok()
            .and_then(|el| el.dyn_into::<HtmlInputElement>().ok())
        else {
            return;
        };
        input.set_type("file");
        input.set_accept(".json");

        let w = widget.clone();
        let picker = input.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            let Some(file) = picker.files().and_then(|files| files.get(0)) else {
                return;
            };
            let w = w.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let text = match JsFuture::from(file.text()).await {
                    Ok(text) => text.as_string().unwrap_or_default(),
                    Err(e) => {
                        log::error!("Could not read backup file: {:?}", e);
                        return;
                    }
                };
                if let Err(e) = w.borrow_mut().import_backup(&text) {
                    log::error!("Import failed: {}", e);
                }
            });
        });
        let _ = input.add_event_listener_with_callback("change", closure.as_ref().unchecked_ref());
        closure.forget();
        input.click();
    }

    /// Offer `contents` as a file download
    fn download(document: &Document, name: &str, contents: &str, mime: &str) {
        let parts = js_sys::Array::of1(&JsValue::from_str(contents));
        let options = web_sys::BlobPropertyBag::new();
        options.set_type(mime);
        let Ok(blob) = web_sys::Blob::new_with_str_sequence_and_options(&parts, &options) else {
            log::error!("Could not build download");
            return;
        };
        let Ok(url) = web_sys::Url::create_object_url_with_blob(&blob) else {
            return;
        };
        if let Some(anchor) = document
            .create_element("a")
            .ok()
            .and_then(|el| el.dyn_into::<HtmlAnchorElement>().ok())
        {
            anchor.set_href(&url);
            anchor.set_download(name);
            anchor.click();
        }
        let _ = web_sys::Url::revoke_object_url(&url);
    }

    fn setup_keyboard(document: &Document, widget: &Shared) {
        let w = widget.clone();
        let doc = document.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
            let typing = doc
                .active_element()
                .map(|el| matches!(el.tag_name().as_str(), "INPUT" | "TEXTAREA"))
                .unwrap_or(false);
            let modifier = event.ctrl_key() || event.meta_key();

            if event.code() == "Space" && !typing {
                event.prevent_default();
                w.borrow_mut().toggle_stopwatch();
            } else if modifier && event.shift_key() && event.key().eq_ignore_ascii_case("d") {
                event.prevent_default();
                log::info!("{}", w.borrow().debug_info());
            } else if modifier && event.key().eq_ignore_ascii_case("s") {
                event.prevent_default();
                w.borrow_mut().save_now();
            }
        });
        let _ = document.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn setup_lifecycle(document: &Document, widget: &Shared) {
        // Visibility change (tab switch, minimize)
        {
            let w = widget.clone();
            let doc = document.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                if doc.visibility_state() == web_sys::VisibilityState::Hidden {
                    w.borrow_mut().on_hidden();
                } else {
                    w.borrow_mut().on_visible();
                }
            });
            let _ = document.add_event_listener_with_callback(
                "visibilitychange",
                closure.as_ref().unchecked_ref(),
            );
            closure.forget();
        }

        // Page unload
        if let Some(window) = web_sys::window() {
            let w = widget.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                if let Ok(mut widget) = w.try_borrow_mut() {
                    widget.on_unload();
                }
            });
            let _ = window
                .add_event_listener_with_callback("beforeunload", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    wasm_app::run();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
mod cli {
    use std::io::{self, BufRead, Write};
    use std::path::PathBuf;
    use std::rc::Rc;

    use daily_productivity::app::{Ports, Widget};
    use daily_productivity::persistence::{FileBackend, Store};
    use daily_productivity::platform::{Clock, SystemClock};
    use daily_productivity::present::LogView;
    use daily_productivity::stopwatch::ManualScheduler;
    use daily_productivity::{Result, StoreError};

    const DATA_ENV: &str = "DAILY_PRODUCTIVITY_DATA";
    const DEFAULT_DATA_FILE: &str = "daily-productivity.json";

    const USAGE: &str = "usage: daily-productivity <command>

commands:
  status          show stopwatch, tasks and storage usage
  laps            print recorded laps, oldest first
  export [file]   write a backup (stdout when no file is given)
  import <file>   replace stored data with a backup
  clear           delete all stored data
  notifications <on|off>
                  turn toast notifications on or off

The store is read from $DAILY_PRODUCTIVITY_DATA (default ./daily-productivity.json).";

    fn ask(prompt: &str) -> bool {
        print!("{} [y/N] ", prompt);
        let _ = io::stdout().flush();
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim(), "y" | "Y" | "yes")
    }

    fn open_widget() -> Result<Widget> {
        let path = std::env::var_os(DATA_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_FILE));
        let backend = FileBackend::open(&path)?;
        log::info!("Using data file {}", backend.path().display());

        let clock: Rc<dyn Clock> = Rc::new(SystemClock);
        let store = Store::open(Box::new(backend), clock.clone());
        Ok(Widget::new(
            Rc::new(store),
            clock,
            Ports {
                scheduler: Box::new(ManualScheduler::default()),
                stopwatch_view: Box::new(LogView),
                task_view: Box::new(LogView),
                header: Box::new(LogView),
                notices: Box::new(LogView),
                confirm: Box::new(|prompt: &str| ask(prompt)),
            },
        ))
    }

    pub fn run(args: &[String]) -> Result<()> {
        let Some(command) = args.first() else {
            println!("{}", USAGE);
            return Ok(());
        };

        match command.as_str() {
            "status" => {
                let widget = open_widget()?;
                println!("{}", widget.debug_info());
            }
            "laps" => {
                let widget = open_widget()?;
                println!("{}", widget.stopwatch().export_laps_text());
            }
            "export" => {
                let mut widget = open_widget()?;
                let json = widget.export_backup()?;
                match args.get(1) {
                    Some(file) => {
                        std::fs::write(file, json)?;
                        println!("Backup written to {}", file);
                    }
                    None => println!("{}", json),
                }
            }
            "import" => {
                let Some(file) = args.get(1) else {
                    return Err(StoreError::MalformedImport(
                        "import needs a backup file".to_string(),
                    ));
                };
                let raw = std::fs::read_to_string(file)?;
                let mut widget = open_widget()?;
                match widget.import_backup(&raw)? {
                    Some(report) => {
                        println!("Restored: {}", report.restored.join(", "));
                        for (field, reason) in &report.rejected {
                            println!("Rejected {}: {}", field, reason);
                        }
                    }
                    None => println!("Import cancelled"),
                }
            }
            "clear" => {
                let mut widget = open_widget()?;
                if widget.clear_all_data() {
                    println!("All data cleared");
                } else {
                    println!("Nothing cleared");
                }
            }
            "notifications" => {
                let enabled = match args.get(1).map(String::as_str) {
                    Some("on") => true,
                    Some("off") => false,
                    _ => {
                        eprintln!("{}", USAGE);
                        return Ok(());
                    }
                };
                let mut widget = open_widget()?;
                widget.set_notifications(enabled)?;
                println!("Notifications {}", if enabled { "on" } else { "off" });
            }
            other => {
                eprintln!("unknown command: {}\n\n{}", other, USAGE);
            }
        }
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> std::process::ExitCode {
    env_logger::init();
    let args: Vec<String> = std::env::args().skip(1).collect();
    match cli::run(&args) {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("error: {}", e);
            std::process::ExitCode::FAILURE
        }
    }
}
