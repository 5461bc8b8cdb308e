use super::{clear_spinner, report, spinner, Format};
use roost_api::Inventory;
use roost_config::Config;
use roost_core::{CommandCollector, Controller, LocalState};

pub fn run(config: &Config, format: Format) -> u8 {
    let state = LocalState::new(&config.state);
    let collector = CommandCollector::new(&config.collector.command);
    let inventory = Inventory::new(super::inventory_transport(config));
    let controller = Controller::new(&state, &collector);

    let pb = spinner("checking in…", format);
    let outcome = controller.checkin(&inventory);
    clear_spinner(pb);
    report(&outcome, format)
}
