use std::error::Error;
use std::fs::File;
use std::process;
use std::time::Duration;

use clap::Parser;
use log::LevelFilter;

use chip8e::display::TermDisplay;
use chip8e::input::TermInput;
use chip8e::interpreter::Interpreter;
use chip8e::rng::Xorshift32;
use chip8e::sound::BeepQueue;

/// accept a colour as decimal or 0x-prefixed hex
fn parse_color(s: &str) -> Result<u32, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("'{}' is not a colour value: {}", s, e))
}

#[derive(Parser)]
#[command(name = "chip8e", about = "A CHIP-8 interpreter that runs in the terminal")]
struct Args {
    /// ROM to run
    #[arg(long)]
    file: String,

    /// colour of lit pixels, 0xRRGGBB
    #[arg(long, value_parser = parse_color, default_value = "0xFFFFFF")]
    fore_color: u32,

    /// colour of unlit pixels, 0xRRGGBB
    #[arg(long, value_parser = parse_color, default_value = "0x000000")]
    back_color: u32,

    /// instruction cycles between display repaints
    #[arg(long, default_value_t = 1)]
    frame_after: u32,

    /// milliseconds slept after each repaint interval
    #[arg(long, default_value_t = 5)]
    copy_delay: u64,

    /// viewport width in terminal cells
    #[arg(long, default_value_t = 66)]
    window_width: u16,

    /// viewport height in terminal cells
    #[arg(long, default_value_t = 34)]
    window_height: u16,

    /// draw with plain dots, for terminals without the block glyph
    #[arg(long)]
    fallback_render: bool,

    /// fix the random number seed for reproducible runs
    #[arg(long)]
    seed: Option<u32>,

    /// log every executed instruction (redirect stderr to keep the canvas readable)
    #[arg(long)]
    debug: bool,
}

fn run(args: &Args) -> Result<(), Box<dyn Error>> {
    let rng = match args.seed {
        Some(seed) => Xorshift32::new(seed),
        None => Xorshift32::from_time(),
    };

    // initialise; the input value holds raw mode until it drops
    let mut display = TermDisplay::new(
        args.window_width,
        args.window_height,
        args.fore_color,
        args.back_color,
        args.fallback_render,
    )?;
    let mut input = TermInput::new()?;
    let mut sound = BeepQueue::new();
    let mut interpreter = Interpreter::new(&mut display, &mut input, &mut sound, rng);

    // load a program
    let mut f = File::open(&args.file)?;
    interpreter.load_program(&mut f)?;

    interpreter.main_loop(args.frame_after, Duration::from_millis(args.copy_delay))?;
    Ok(())
}

fn main() {
    let args = Args::parse();

    env_logger::Builder::from_default_env()
        .filter_level(LevelFilter::Off)
        .filter_module(
            "chip8e",
            if args.debug {
                LevelFilter::Debug
            } else {
                LevelFilter::Warn
            },
        )
        .init();

    let result = run(&args);

    // shove some newlines at stdout so the prompt doesn't land on the last frame
    for _ in 0..4 {
        println!();
    }

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
