use crate::models::{Decision, DecisionAction};
use crate::profile::FairValueArea;

/// Dispersion at or below this is treated as a flat (degenerate) profile
pub const FLAT_DISPERSION_THRESHOLD: f64 = 1e-8;

/// Buffer outside the FVA bounds to avoid signaling on noise
pub const FVA_BUFFER_PCT: f64 = 0.0025;

/// Derive a directional decision from the profile summary and the
/// current price.
///
/// Outside the buffered FVA the rule is mean reversion toward the POC;
/// strictly inside the FVA it follows momentum relative to the POC.
/// Pure and deterministic: same inputs, same output.
pub fn decide(
    poc: Option<f64>,
    fva: &FairValueArea,
    dispersion: f64,
    current_price: Option<f64>,
) -> Decision {
    let (Some(poc), Some(fva_low), Some(fva_high), Some(current_price)) =
        (poc, fva.low, fva.high, current_price)
    else {
        return Decision::none("insufficient data");
    };

    if dispersion <= FLAT_DISPERSION_THRESHOLD {
        return Decision::none("flat volume distribution");
    }

    let upper_buffer = fva_high * (1.0 + FVA_BUFFER_PCT);
    let lower_buffer = fva_low * (1.0 - FVA_BUFFER_PCT);

    // Outside FVA: mean-reversion to POC
    if current_price > upper_buffer {
        return Decision {
            action: DecisionAction::Short,
            reason: format!(
                "price above FVA.high (>{:.2}%) -> mean revert to POC",
                FVA_BUFFER_PCT * 100.0
            ),
        };
    }
    if current_price < lower_buffer {
        return Decision {
            action: DecisionAction::Long,
            reason: format!(
                "price below FVA.low (<-{:.2}%) -> mean revert to POC",
                FVA_BUFFER_PCT * 100.0
            ),
        };
    }

    // Inside FVA: follow direction relative to POC
    if current_price > poc {
        return Decision {
            action: DecisionAction::Long,
            reason: "inside FVA and price above POC -> momentum long".to_string(),
        };
    }
    if current_price < poc {
        return Decision {
            action: DecisionAction::Short,
            reason: "inside FVA and price below POC -> momentum short".to_string(),
        };
    }

    Decision::none("no clear rule matched")
}
