// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Virtual bus simulation.
//!
//! Runs a controller and several modules on one virtual CAN segment and
//! walks them through enable, disable, re-enable and a transport fault.

use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use canmod::config::{load_config, AddressMode, ModuleConfig};
use canmod::hal::{CanAdapter, ChipSelect, FaultInjector, StdClock, VirtualBus, VirtualPeripheral};
use canmod::lifecycle::StandardModule;
use canmod::net::{AddressPlan, ModuleAddress, ModuleMessage, Network};
use canmod::observability::{debug_flags_help, init_console_logging, parse_debug_flags};
use tracing::{info, warn};

const CONTROLLER_ADDRESS: u8 = 0xFE;
const FIRST_SIM_ADDRESS: u8 = 0x10;
const MAX_SIM_MODULES: u8 = 32;

struct SimArgs {
    modules: u8,
    cycles: u32,
    config: Option<PathBuf>,
}

fn usage_and_exit() -> ! {
    eprintln!(
        "Usage: module_sim [--modules <n>] [--cycles <n>] [--config <path>] [debug flags]\n\n\
         Defaults:\n\
         - modules: 3\n\
         - cycles: 40\n\n\
         {}",
        debug_flags_help()
    );
    process::exit(2);
}

fn parse_args() -> SimArgs {
    let mut sim = SimArgs {
        modules: 3,
        cycles: 40,
        config: None,
    };

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--modules" => {
                let v = args.next().unwrap_or_else(|| usage_and_exit());
                sim.modules = v.parse().unwrap_or_else(|_| usage_and_exit());
            }
            "--cycles" => {
                let v = args.next().unwrap_or_else(|| usage_and_exit());
                sim.cycles = v.parse().unwrap_or_else(|_| usage_and_exit());
            }
            "--config" => {
                let v = args.next().unwrap_or_else(|| usage_and_exit());
                sim.config = Some(PathBuf::from(v));
            }
            "-h" | "--help" => usage_and_exit(),
            other if other.starts_with("--debug-") => {}
            other => {
                eprintln!("Unknown argument: {other}");
                usage_and_exit();
            }
        }
    }
    sim
}

type SimModule = StandardModule<VirtualPeripheral, StdClock>;

/// Bench controller: enables and disables the segment and tallies status
struct Controller {
    network: Network<VirtualPeripheral>,
    status_seen: BTreeMap<u8, u64>,
}

impl Controller {
    fn start(bus: &VirtualBus, config: &ModuleConfig) -> Result<Self> {
        let adapter = CanAdapter::open_bus(bus.attach("controller"), ChipSelect::default())?;
        let mut network = Network::new(adapter, 0xC0_47_20_11, &config.network);
        let address = ModuleAddress::new(CONTROLLER_ADDRESS).context("controller address")?;
        network.resolve_address(&AddressPlan::Fixed(address), &StdClock::new())?;
        Ok(Self {
            network,
            status_seen: BTreeMap::new(),
        })
    }

    fn broadcast(&mut self, msg: ModuleMessage) -> Result<()> {
        info!(message = ?msg, "controller broadcast");
        self.network.announce(&msg)?;
        Ok(())
    }

    fn drain(&mut self) -> Result<()> {
        while let Some(msg) = self.network.poll()? {
            match msg {
                ModuleMessage::Status { address, .. } => {
                    *self.status_seen.entry(address).or_default() += 1;
                }
                ModuleMessage::Fault { address, code } => {
                    warn!(address, code = ?code, "module reported a fault");
                }
                _ => {}
            }
        }
        Ok(())
    }
}

fn module_config(base: &ModuleConfig, index: u8) -> ModuleConfig {
    let mut config = base.clone();
    config.module.name = format!("sim-module-{index}");
    config.module.serial = Some(0x5100 + u32::from(index));
    config.network.address.mode = AddressMode::Fixed;
    config.network.address.address = FIRST_SIM_ADDRESS + index;
    config
}

fn main() -> Result<()> {
    let sim = parse_args();

    let base = match &sim.config {
        Some(path) => {
            load_config(Some(path.as_path()), None).context("failed to load module config")?
        }
        None => {
            let mut config = ModuleConfig::default();
            config.network.negotiation_rounds = 2;
            config.network.negotiation_interval_ms = 5;
            config
        }
    };
    init_console_logging(&parse_debug_flags(), &base.logging.level)?;

    let bus = VirtualBus::new("module-sim");
    let mut controller = Controller::start(&bus, &base)?;

    let mut modules: Vec<(SimModule, FaultInjector)> = Vec::new();
    for index in 0..sim.modules.min(MAX_SIM_MODULES) {
        let config = module_config(&base, index);
        let peripheral = bus.attach(&config.module.name);
        let faults = peripheral.injector();
        let mut module = StandardModule::new(config, peripheral, StdClock::new());
        module
            .setup()
            .with_context(|| format!("setup of module {index} failed"))?;
        modules.push((module, faults));
    }
    info!(modules = modules.len(), cycles = sim.cycles, "simulation started");

    let disable_at = sim.cycles / 4;
    let reenable_at = sim.cycles / 2;
    let fault_at = sim.cycles * 3 / 4;

    controller.broadcast(ModuleMessage::Enable)?;
    for cycle in 0..sim.cycles {
        if cycle == disable_at {
            controller.broadcast(ModuleMessage::Disable)?;
        }
        if cycle == reenable_at {
            controller.broadcast(ModuleMessage::Enable)?;
        }
        if cycle == fault_at {
            if let Some((_, faults)) = modules.first() {
                info!("injecting a bus error into the first module");
                faults.bus_error_on_receive("simulated bus-off");
            }
        }

        for (module, _) in modules.iter_mut() {
            module.loop_head()?;
            // Application logic would run here
            module.loop_tail()?;
        }
        controller.drain()?;
    }

    println!("{:<16} {:>8} {:<20} {:>8} {:>8}", "module", "address", "state", "cycles", "status");
    for (module, _) in &modules {
        let address = module.address().map(|a| a.value()).unwrap_or_default();
        println!(
            "{:<16} {:>#8x} {:<20} {:>8} {:>8}",
            module.config().module.name,
            address,
            module.state().as_str(),
            module.stats().cycles,
            controller.status_seen.get(&address).copied().unwrap_or_default(),
        );
    }
    Ok(())
}
