use serde::{Deserialize, Serialize};

//fast and slow moving average values for one bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaPair {
    pub fast: f64,
    pub slow: f64,
}

impl MaPair {
    pub fn new(fast: f64, slow: f64) -> Self {
        MaPair { fast, slow }
    }
}

//fast crosses above slow between `prev` and `current`
pub fn golden_cross(prev: MaPair, current: MaPair) -> bool {
    prev.fast <= prev.slow && current.fast > current.slow
}

//fast crosses below slow between `prev` and `current`
pub fn death_cross(prev: MaPair, current: MaPair) -> bool {
    prev.fast >= prev.slow && current.fast < current.slow
}

//everything the rule looks at on one bar
#[derive(Debug, Clone, Copy)]
pub struct RuleInput {
    pub prev: MaPair,
    pub current: MaPair,
    pub close: f64,
    pub atr: Option<f64>,
    pub in_position: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Signal {
    Hold,
    //open a long position
    Enter,
    //close fell below the trailing stop
    StopHit { stop: f64 },
    //fast average crossed below slow
    DeathCross,
}

impl Signal {
    pub fn is_exit(&self) -> bool {
        matches!(self, Signal::StopHit { .. } | Signal::DeathCross)
    }
}

//crossover entry/exit rule with an optional atr trailing stop.
//
//while long, exits are checked in order: stop hit, stop ratchet, death cross.
//a stop hit ends evaluation for the bar. the stop only ever moves up and is
//cleared whenever an exit is signalled.
#[derive(Debug, Clone)]
pub struct CrossoverRule {
    atr_multiple: Option<f64>,
    stop_level: Option<f64>,
}

impl CrossoverRule {
    //`atr_multiple` of none disables the trailing stop
    pub fn new(atr_multiple: Option<f64>) -> Self {
        CrossoverRule {
            atr_multiple,
            stop_level: None,
        }
    }

    pub fn stop_level(&self) -> Option<f64> {
        self.stop_level
    }

    pub fn uses_stop(&self) -> bool {
        self.atr_multiple.is_some()
    }

    //places the initial stop below the entry fill
    pub fn seed_stop(&mut self, entry_price: f64, atr: Option<f64>) -> Option<f64> {
        if let (Some(multiple), Some(atr)) = (self.atr_multiple, atr) {
            self.stop_level = Some(entry_price - atr * multiple);
        }
        self.stop_level
    }

    pub fn evaluate(&mut self, input: &RuleInput) -> Signal {
        if !input.in_position {
            if golden_cross(input.prev, input.current) {
                return Signal::Enter;
            }
            return Signal::Hold;
        }

        if let Some(stop) = self.stop_level {
            if input.close < stop {
                self.stop_level = None;
                return Signal::StopHit { stop };
            }
        }

        if let (Some(multiple), Some(atr)) = (self.atr_multiple, input.atr) {
            let candidate = input.close - atr * multiple;
            if self.stop_level.map_or(true, |stop| candidate > stop) {
                self.stop_level = Some(candidate);
            }
        }

        if death_cross(input.prev, input.current) {
            self.stop_level = None;
            return Signal::DeathCross;
        }

        Signal::Hold
    }
}
