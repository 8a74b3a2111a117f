// SPDX-License-Identifier: CEPL-1.0
#![deny(unsafe_op_in_unsafe_fn)]
use anyhow::{Context, Result};
use clap::Parser;
use ember_core::init_tracing;
use ember_platform::{pixel_size, window_attributes, WindowConfig};
use ember_vk::{describe_adapters, AshDriver, ContextConfig, VkContext};
use tracing::{error, info};

use ember_platform::winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file
    #[arg(long, default_value = "ember.toml")]
    config: PathBuf,

    /// Print every adapter with its properties and score, then exit
    #[arg(long)]
    list_adapters: bool,

    /// Override the config's validation-layer setting
    #[arg(long)]
    validation: Option<bool>,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
struct ContextCfg {
    app_name: String,
    required_extensions: Vec<String>,
    validation: bool,
}

impl Default for ContextCfg {
    fn default() -> Self {
        let d = ContextConfig::default();
        ContextCfg {
            app_name: d.app_name,
            required_extensions: d
                .required_extensions
                .iter()
                .map(|e| e.to_string_lossy().into_owned())
                .collect(),
            validation: d.validation,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
struct AppCfg {
    #[serde(default)]
    window: WindowConfig,
    #[serde(default)]
    context: ContextCfg,
}

impl AppCfg {
    fn context_config(&self) -> Result<ContextConfig> {
        let cfg = ContextConfig {
            app_name: self.context.app_name.clone(),
            validation: self.context.validation,
            ..ContextConfig::default()
        };
        cfg.with_required_extensions(self.context.required_extensions.iter().map(String::as_str))
            .context("context.required_extensions")
    }
}

fn parse_cfg(s: &str) -> AppCfg {
    toml::from_str::<AppCfg>(s).unwrap_or_else(|e| {
        error!("config parse error, using defaults: {e}");
        AppCfg::default()
    })
}

fn load_cfg(path: &Path) -> AppCfg {
    match fs::read_to_string(path) {
        Ok(s) => parse_cfg(&s),
        Err(_) => AppCfg::default(),
    }
}

fn list_adapters(config: ContextConfig) -> Result<()> {
    let driver = AshDriver::load(None).context("load vulkan")?;
    let mut ctx = VkContext::new(driver, config);
    ctx.create_instance().context("create instance")?;
    for (i, (_, info, score)) in describe_adapters(ctx.driver())
        .context("enumerate adapters")?
        .into_iter()
        .enumerate()
    {
        println!(
            "[{i}] {} ({:?}) api {} vendor 0x{:04x} device 0x{:04x} largest heap {} MiB score {score}",
            info.name,
            info.device_type,
            info.api_version_string(),
            info.vendor_id,
            info.device_id,
            info.largest_heap() / (1024 * 1024),
        );
    }
    Ok(())
}

struct App {
    cfg: AppCfg,
    context_cfg: ContextConfig,
    // Field order matters: the context (and its surface) drops before the window.
    context: Option<VkContext<AshDriver>>,
    window: Option<Window>,
    failure: Option<anyhow::Error>,
}

impl App {
    fn init_context(&self, window: &Window) -> Result<VkContext<AshDriver>> {
        let size = pixel_size(window);
        VkContext::for_window(window, window, size, self.context_cfg.clone())
            .context("vulkan context initialisation")
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window = match event_loop.create_window(window_attributes(&self.cfg.window)) {
            Ok(w) => w,
            Err(e) => {
                self.failure = Some(anyhow::Error::new(e).context("create_window"));
                event_loop.exit();
                return;
            }
        };

        match self.init_context(&window) {
            Ok(ctx) => {
                if let (Some(adapter), Some(extent)) = (ctx.adapter(), ctx.swapchain_extent()) {
                    info!(
                        "context ready on {} ({}x{}, {} swapchain images)",
                        adapter.info.name,
                        extent.width,
                        extent.height,
                        ctx.swapchain_images().len()
                    );
                }
                self.context = Some(ctx);
            }
            Err(e) => {
                error!("{e:#}");
                self.failure = Some(e);
                event_loop.exit();
            }
        }
        self.window = Some(window);
        event_loop.set_control_flow(ControlFlow::Wait);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if let Some(window) = &self.window {
            if window_id != window.id() {
                return;
            }
        }

        if let WindowEvent::CloseRequested = event {
            info!("CloseRequested");
            self.context = None;
            self.window = None;
            event_loop.exit();
        }
    }
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let cfg = load_cfg(&args.config);
    let mut context_cfg = cfg.context_config()?;
    if let Some(validation) = args.validation {
        context_cfg.validation = validation;
    }

    if args.list_adapters {
        return list_adapters(context_cfg);
    }

    let event_loop: EventLoop<()> = EventLoop::new()?;
    let mut app = App {
        cfg,
        context_cfg,
        context: None,
        window: None,
        failure: None,
    };
    event_loop.run_app(&mut app)?;

    // Tear down before reporting, in case the loop exited on failure.
    app.context = None;
    match app.failure.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
