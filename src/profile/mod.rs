use crate::models::AggTrade;

pub const DEFAULT_PRICE_BINS: usize = 40;
pub const DEFAULT_FVA_TARGET_PCT: f64 = 0.7;

/// One slice of the binned price range
#[derive(Debug, Clone, PartialEq)]
pub struct Bin {
    pub low: f64,
    pub high: f64,
    pub midpoint: f64,
    pub volume: f64,
}

/// Minimal contiguous price range around the POC containing the target
/// share of total volume. Both bounds are None for a degenerate profile.
#[derive(Debug, Clone, PartialEq)]
pub struct FairValueArea {
    pub low: Option<f64>,
    pub high: Option<f64>,
}

impl FairValueArea {
    pub fn empty() -> Self {
        Self {
            low: None,
            high: None,
        }
    }
}

/// Volume-weighted price distribution for one analysis window.
///
/// Recomputed fresh every tick from the current window's trades; never
/// mutated incrementally.
#[derive(Debug, Clone)]
pub struct VolumeProfile {
    pub bins: Vec<Bin>,
    /// Midpoint price of the highest-volume bin
    pub poc: Option<f64>,
    pub fva: FairValueArea,
    /// Population standard deviation of per-bin volumes
    pub dispersion: f64,
    pub total_volume: f64,
}

impl VolumeProfile {
    fn empty() -> Self {
        Self {
            bins: Vec::new(),
            poc: None,
            fva: FairValueArea::empty(),
            dispersion: 0.0,
            total_volume: 0.0,
        }
    }
}

/// Build the volume profile for one window's trades.
///
/// The observed price range `[min, max]` is split into `price_bins`
/// contiguous bins and each trade's quantity is accumulated into the bin
/// its price falls in. The Point of Control is the midpoint of the
/// highest-volume bin (ties go to the lowest-price bin), and the Fair
/// Value Area grows outward from it until it covers `fva_target_pct` of
/// total volume.
pub fn compute_volume_profile(
    trades: &[AggTrade],
    price_bins: usize,
    fva_target_pct: f64,
) -> VolumeProfile {
    if trades.is_empty() || price_bins == 0 {
        return VolumeProfile::empty();
    }

    let min = trades.iter().map(|t| t.price).fold(f64::INFINITY, f64::min);
    let max = trades
        .iter()
        .map(|t| t.price)
        .fold(f64::NEG_INFINITY, f64::max);

    // All trades at the same price would give step == 0; fall back to 1
    // so the index math stays defined.
    let mut step = (max - min) / price_bins as f64;
    if step == 0.0 {
        step = 1.0;
    }

    let mut bins: Vec<Bin> = (0..price_bins)
        .map(|i| Bin {
            low: min + i as f64 * step,
            high: min + (i + 1) as f64 * step,
            midpoint: min + (i as f64 + 0.5) * step,
            volume: 0.0,
        })
        .collect();

    for trade in trades {
        let idx = (((trade.price - min) / step).floor() as usize).min(price_bins - 1);
        bins[idx].volume += trade.quantity;
    }

    let total_volume: f64 = bins.iter().map(|b| b.volume).sum();

    // Dispersion over the per-bin volume series, not over trade prices
    let mean = total_volume / bins.len() as f64;
    let variance = bins
        .iter()
        .map(|b| (b.volume - mean).powi(2))
        .sum::<f64>()
        / bins.len() as f64;
    let dispersion = variance.sqrt();

    // POC: first bin with the maximum volume (tie resolves to the lower
    // price side).
    let mut poc_idx = 0;
    for (i, bin) in bins.iter().enumerate() {
        if bin.volume > bins[poc_idx].volume {
            poc_idx = i;
        }
    }
    let poc = bins[poc_idx].midpoint;

    let fva = expand_fair_value_area(&bins, poc_idx, total_volume, fva_target_pct);

    VolumeProfile {
        bins,
        poc: Some(poc),
        fva,
        dispersion,
        total_volume,
    }
}

/// Greedily expand a contiguous bin range outward from the POC bin, one
/// bin at a time, always taking the larger-volume neighbor (ties expand
/// downward), until the range holds the target share of total volume or
/// both sides are exhausted.
fn expand_fair_value_area(
    bins: &[Bin],
    poc_idx: usize,
    total_volume: f64,
    target_pct: f64,
) -> FairValueArea {
    let mut low = poc_idx;
    let mut high = poc_idx;
    let mut cumulative = bins[poc_idx].volume;
    let target = total_volume * target_pct;

    while cumulative < target {
        let below = (low > 0).then(|| bins[low - 1].volume);
        let above = (high + 1 < bins.len()).then(|| bins[high + 1].volume);

        match (below, above) {
            (None, None) => break,
            (Some(b), Some(a)) if b >= a => {
                low -= 1;
                cumulative += b;
            }
            (Some(_), Some(a)) => {
                high += 1;
                cumulative += a;
            }
            (Some(b), None) => {
                low -= 1;
                cumulative += b;
            }
            (None, Some(a)) => {
                high += 1;
                cumulative += a;
            }
        }
    }

    FairValueArea {
        low: Some(bins[low].low),
        high: Some(bins[high].high),
    }
}
