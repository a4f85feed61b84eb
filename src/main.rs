//! monopal - monochrome framebuffer viewer for the Linux console
//!
//! Stand-in for a VM: draws a test pattern into a 1bpp framebuffer, shows
//! it through a [`Session`] and logs the decoded event stream.

use anyhow::{bail, Context, Result};
use log::info;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use monopal::config::{self, Config};
use monopal::constants::{stride_bytes, DEFAULT_POLL_TIMEOUT_MS, MAX_DIMENSION};
use monopal::host::ConsoleHost;
use monopal::{DecodedEvent, EventDecoder, FrameView, PollStatus, Session};

const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 480;

fn print_help() {
    println!(
        r#"monopal - monochrome framebuffer on the Linux console

USAGE:
    monopal [OPTIONS]

OPTIONS:
    -h, --help              Print this help message
    -V, --version           Print version information
    -t, --test              Test mode (verify build without DRM)
    --init-config           Generate default config file
    -f, --force             Overwrite config file without confirmation
    --size WxH              Framebuffer size (default {}x{})

Run from a virtual console (Ctrl+Alt+F2), not inside a desktop session.
Press the terminate key (default Ctrl+Q) to exit.

ENVIRONMENT:
    MONOPAL_CONFIG          Path to config file
    RUST_LOG                Log level (e.g. monopal=debug)
"#,
        DEFAULT_WIDTH, DEFAULT_HEIGHT
    );
}

/// Parse `WxH`
fn parse_size(s: &str) -> Result<(u32, u32)> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .with_context(|| format!("Invalid size '{}' (expected WxH)", s))?;
    let w: u32 = w.trim().parse().with_context(|| format!("Invalid width '{}'", w))?;
    let h: u32 = h.trim().parse().with_context(|| format!("Invalid height '{}'", h))?;
    if w == 0 || h == 0 || w > MAX_DIMENSION || h > MAX_DIMENSION {
        bail!("Size must be between 1x1 and {0}x{0}", MAX_DIMENSION);
    }
    Ok((w, h))
}

/// 1bpp framebuffer in the layout the VM uses
struct Bitmap {
    bytes: Rc<RefCell<Vec<u8>>>,
    width: u32,
    height: u32,
    stride: usize,
}

impl Bitmap {
    fn new(width: u32, height: u32) -> Self {
        let stride = stride_bytes(width);
        Self {
            bytes: Rc::new(RefCell::new(vec![0; stride * height as usize])),
            width,
            height,
            stride,
        }
    }

    fn set(&self, x: u32, y: u32, ink: bool) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = y as usize * self.stride + (x / 8) as usize;
        let bit = 0x80u8 >> (x % 8);
        let mut bytes = self.bytes.borrow_mut();
        if ink {
            bytes[idx] |= bit;
        } else {
            bytes[idx] &= !bit;
        }
    }

    /// Border, diagonal hatching and a solid block in the middle
    fn draw_test_pattern(&self) {
        for y in 0..self.height {
            for x in 0..self.width {
                let border = x < 2 || y < 2 || x + 2 >= self.width || y + 2 >= self.height;
                let hatch = (x + y) % 16 == 0;
                let block = x.abs_diff(self.width / 2) < self.width / 8
                    && y.abs_diff(self.height / 2) < self.height / 8;
                self.set(x, y, border || hatch || block);
            }
        }
    }

    /// Invert a 3x3 dot, the way a VM would draw its own pointer echo
    fn toggle_dot(&self, cx: u32, cy: u32) {
        for y in cy.saturating_sub(1)..=cy + 1 {
            for x in cx.saturating_sub(1)..=cx + 1 {
                if x >= self.width || y >= self.height {
                    continue;
                }
                let idx = y as usize * self.stride + (x / 8) as usize;
                let bit = 0x80u8 >> (x % 8);
                self.bytes.borrow_mut()[idx] ^= bit;
            }
        }
    }
}

fn run(config: &Config, width: u32, height: u32) -> Result<()> {
    let bitmap = Bitmap::new(width, height);
    bitmap.draw_test_pattern();

    let host = ConsoleHost::new(config)?;
    let mut session = Session::with_config(host, config)?;
    session.init(FrameView::shared(Rc::clone(&bitmap.bytes)), width, height)?;
    info!("Running {}x{}", width, height);

    let mut decoder = EventDecoder::new();
    let (mut dot_x, mut dot_y) = (width / 2, height / 2);
    bitmap.toggle_dot(dot_x, dot_y);

    let timeout = Duration::from_millis(DEFAULT_POLL_TIMEOUT_MS);
    loop {
        if let PollStatus::Terminated = session.poll_events(timeout) {
            break;
        }

        let (old_x, old_y) = (dot_x, dot_y);
        while let Some(word) = session.next_event() {
            let Some(event) = decoder.feed(word) else {
                continue;
            };
            match event {
                DecodedEvent::XLocation(x) => dot_x = x as u32,
                DecodedEvent::YLocation(y) => dot_y = y as u32,
                DecodedEvent::DeltaTime(_) | DecodedEvent::AbsoluteTime(_) => {}
                other => info!("event: {:?}", other),
            }
        }

        if (old_x, old_y) != (dot_x, dot_y) {
            bitmap.toggle_dot(old_x, old_y);
            bitmap.toggle_dot(dot_x, dot_y);
            session.update_area(old_x.saturating_sub(1), old_y.saturating_sub(1), 3, 3);
            session.update_area(dot_x.saturating_sub(1), dot_y.saturating_sub(1), 3, 3);
        }
    }

    session.deinit();
    info!("monopal exiting");
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = std::env::args().collect();

    // --help
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    // --version
    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("monopal {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    if args.iter().any(|a| a == "--test" || a == "-t") {
        info!("Test mode: skipping DRM initialization");
        eprintln!("[OK] monopal build verification complete");
        return Ok(());
    }

    // Config file generation mode
    if args.iter().any(|a| a == "--init-config") {
        let force = args.iter().any(|a| a == "--force" || a == "-f");

        if let Some(path) = config::default_config_path() {
            if path.exists() && !force {
                println!("Config file already exists: {}", path.display());
                print!("Overwrite? [y/N]: ");
                std::io::Write::flush(&mut std::io::stdout())?;

                let mut input = String::new();
                std::io::stdin().read_line(&mut input)?;
                let input = input.trim().to_lowercase();

                if input != "y" && input != "yes" {
                    println!("Aborted.");
                    return Ok(());
                }
            }
        }

        return match Config::write_default_config(true) {
            Ok(path) => {
                println!("Config file generated: {}", path.display());
                Ok(())
            }
            Err(e) => {
                eprintln!("Failed to generate config: {}", e);
                Err(e)
            }
        };
    }

    let (width, height) = match args.iter().position(|a| a == "--size") {
        Some(i) => {
            let value = args
                .get(i + 1)
                .context("--size needs a value (e.g. --size 1024x768)")?;
            parse_size(value)?
        }
        None => (DEFAULT_WIDTH, DEFAULT_HEIGHT),
    };

    info!("monopal starting...");
    let config = Config::load();
    run(&config, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("640x480").unwrap(), (640, 480));
        assert_eq!(parse_size("1024X768").unwrap(), (1024, 768));
        assert!(parse_size("640").is_err());
        assert!(parse_size("0x480").is_err());
        assert!(parse_size("4097x10").is_err());
        assert!(parse_size("axb").is_err());
    }

    #[test]
    fn test_bitmap_set_and_toggle() {
        let bm = Bitmap::new(20, 4);
        assert_eq!(bm.stride, 4);
        bm.set(0, 0, true);
        bm.set(9, 1, true);
        assert_eq!(bm.bytes.borrow()[0], 0x80);
        assert_eq!(bm.bytes.borrow()[4 + 1], 0x40);
        bm.set(0, 0, false);
        assert_eq!(bm.bytes.borrow()[0], 0);

        bm.toggle_dot(1, 1);
        assert_eq!(bm.bytes.borrow()[0], 0xE0);
        bm.toggle_dot(1, 1);
        assert_eq!(bm.bytes.borrow()[0], 0);
    }
}
