//! Drive the scanner against the simulated matrix and print what it reports.

use anyhow::{bail, ensure, Context, Result};
use clap::{Args, ValueEnum};
use keypad::sim::SimIo;
use keypad::{Config, PinId, Policy, Position, Scanner, Timing, COLS, ROWS};
use log::info;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Re-sample, then wait for release before reporting
    Blocking,
    /// Re-sample and report immediately, once per press
    Debounce,
    /// Non-blocking polling through the press tracker
    Poll,
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Key to hold down (e.g. 8, A, '#'); omit for an idle keypad
    #[arg(short, long)]
    pub press: Option<char>,

    /// Release the key after this many simulated milliseconds
    #[arg(long)]
    pub hold_ms: Option<u64>,

    /// Raw samples the key produces before settling, e.g. 1010 for a bounce
    #[arg(long)]
    pub bounce: Option<String>,

    #[arg(long, value_enum, default_value_t = Mode::Debounce)]
    pub mode: Mode,

    /// Number of scanner calls to make
    #[arg(short = 'n', long, default_value_t = 8)]
    pub calls: usize,

    #[command(flatten)]
    pub pins: PinArgs,

    #[arg(long, default_value_t = Timing::new().settle_ms)]
    pub settle_ms: u16,

    #[arg(long, default_value_t = Timing::new().recover_ms)]
    pub recover_ms: u16,

    #[arg(long, default_value_t = Timing::new().debounce_ms)]
    pub debounce_ms: u16,

    #[arg(long, default_value_t = Timing::new().hold_poll_ms)]
    pub hold_poll_ms: u16,
}

#[derive(Args, Debug)]
pub struct PinArgs {
    /// Strobe (row) pin ids, top row first
    #[arg(long, value_delimiter = ',', default_value = "0,1,2,3")]
    pub strobe: Vec<PinId>,

    /// Sense (column) pin ids, left column first
    #[arg(long, value_delimiter = ',', default_value = "4,5,6,7")]
    pub sense: Vec<PinId>,
}

impl PinArgs {
    pub fn resolve(&self) -> Result<([PinId; ROWS], [PinId; COLS])> {
        let strobe: [PinId; ROWS] = self
            .strobe
            .as_slice()
            .try_into()
            .with_context(|| format!("--strobe needs {} pins, got {}", ROWS, self.strobe.len()))?;
        let sense: [PinId; COLS] = self
            .sense
            .as_slice()
            .try_into()
            .with_context(|| format!("--sense needs {} pins, got {}", COLS, self.sense.len()))?;

        let mut all: Vec<PinId> = strobe.iter().chain(sense.iter()).copied().collect();
        all.sort_unstable();
        all.dedup();
        ensure!(all.len() == ROWS + COLS, "strobe and sense pins must all be distinct");

        Ok((strobe, sense))
    }
}

fn parse_bounce(pattern: &str) -> Result<Vec<bool>> {
    pattern
        .chars()
        .map(|c| match c {
            '1' => Ok(true),
            '0' => Ok(false),
            other => bail!("bounce pattern may only contain 0 and 1, found '{}'", other),
        })
        .collect()
}

pub fn run(args: &SimulateArgs) -> Result<()> {
    let (strobe, sense) = args.pins.resolve()?;

    let key = args
        .press
        .map(|symbol| {
            Position::of_symbol(symbol).with_context(|| format!("no key labelled '{}'", symbol))
        })
        .transpose()?;

    if args.mode == Mode::Blocking && key.is_some() && args.hold_ms.is_none() {
        bail!("--mode blocking waits for release forever on a held key; pass --hold-ms");
    }

    let mut sim = SimIo::new(strobe, sense);
    if let Some(key) = key {
        if let Some(pattern) = &args.bounce {
            sim.script(key, parse_bounce(pattern)?);
        }
        match args.hold_ms {
            Some(ms) => sim.press_for(key, ms),
            None => sim.press(key),
        }
    }

    let timing = Timing {
        settle_ms: args.settle_ms,
        recover_ms: args.recover_ms,
        debounce_ms: args.debounce_ms,
        hold_poll_ms: args.hold_poll_ms,
    };
    let policy = match args.mode {
        Mode::Blocking => Policy::BlockUntilRelease,
        Mode::Debounce | Mode::Poll => Policy::DebounceSample,
    };
    let config = Config::new().with_timing(timing).with_policy(policy);
    info!("simulating {:?} with {:?}", args.mode, config);

    let mut scanner = Scanner::with_config(sim, strobe, sense, config);

    println!("call   start    took  result");
    for call in 1..=args.calls {
        let start = scanner.io().now_ms();
        let result = match args.mode {
            Mode::Poll => scanner.poll(),
            Mode::Blocking | Mode::Debounce => scanner.get_press(),
        };
        let took = scanner.io().now_ms() - start;
        let shown = result.map_or_else(|| "-".to_string(), |c| c.to_string());
        println!("{:>4} {:>5}ms {:>5}ms  {}", call, start, took, shown);
    }

    let sim = scanner.free();
    println!("max simultaneous strobes: {}", sim.max_active_strobes());
    ensure!(
        sim.max_active_strobes() <= 1,
        "more than one strobe line was active at once"
    );
    Ok(())
}
