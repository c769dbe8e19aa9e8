pub mod simulated;

pub use simulated::SimulatedTerminalSession;
