use serde::{Deserialize, Serialize};

use crate::format;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeeRevenueType {
    TableTime,
    Streaming,
}

impl FeeRevenueType {
    pub const ALL: [FeeRevenueType; 2] = [FeeRevenueType::TableTime, FeeRevenueType::Streaming];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeeRevenueType::TableTime => "TABLE_TIME",
            FeeRevenueType::Streaming => "STREAMING",
        }
    }

    /// `Table time`
    pub fn label(&self) -> String {
        format::humanize_key(self.as_str())
    }

    fn sort_rank(&self) -> u8 {
        match self {
            FeeRevenueType::TableTime => 0,
            FeeRevenueType::Streaming => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PricingModel {
    Percentage,
    Flat,
}

impl PricingModel {
    pub const ALL: [PricingModel; 2] = [PricingModel::Percentage, PricingModel::Flat];

    pub fn as_str(&self) -> &'static str {
        match self {
            PricingModel::Percentage => "PERCENTAGE",
            PricingModel::Flat => "FLAT",
        }
    }

    pub fn label(&self) -> String {
        format::humanize_key(self.as_str())
    }
}

/// A fee band as stored by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomFeeSchedule {
    pub id: i64,
    pub room_id: i64,
    pub revenue_type: FeeRevenueType,
    pub pricing_model: PricingModel,
    #[serde(default)]
    pub lower_bound_cents: Option<i64>,
    #[serde(default)]
    pub upper_bound_cents: Option<i64>,
    #[serde(default)]
    pub percent: Option<f64>,
    #[serde(default)]
    pub flat_cents: Option<i64>,
}

/// `GET /web/admin/room-fees/{slug}`
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RoomFeesResponse {
    #[serde(default)]
    pub fees: Vec<RoomFeeSchedule>,
}

/// A fee band as submitted by the editor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomFeeScheduleInput {
    pub revenue_type: FeeRevenueType,
    pub pricing_model: PricingModel,
    #[serde(default)]
    pub percent: Option<f64>,
    #[serde(default)]
    pub flat_cents: Option<i64>,
    #[serde(default)]
    pub lower_bound_cents: Option<i64>,
    #[serde(default)]
    pub upper_bound_cents: Option<i64>,
}

impl From<&RoomFeeSchedule> for RoomFeeScheduleInput {
    fn from(fee: &RoomFeeSchedule) -> Self {
        Self {
            revenue_type: fee.revenue_type,
            pricing_model: fee.pricing_model,
            percent: fee.percent,
            flat_cents: fee.flat_cents,
            lower_bound_cents: fee.lower_bound_cents,
            upper_bound_cents: fee.upper_bound_cents,
        }
    }
}

impl RoomFeeScheduleInput {
    /// Band shown for a freshly added row in the editor.
    pub fn blank() -> Self {
        Self {
            revenue_type: FeeRevenueType::TableTime,
            pricing_model: PricingModel::Percentage,
            percent: Some(0.0),
            flat_cents: Some(0),
            lower_bound_cents: Some(0),
            upper_bound_cents: Some(999_999),
        }
    }

    /// Non-numeric rates become null, and a zero bound means "unbounded".
    pub fn sanitized(self) -> Self {
        Self {
            percent: self.percent.filter(|p| p.is_finite()),
            lower_bound_cents: self.lower_bound_cents.filter(|b| *b != 0),
            upper_bound_cents: self.upper_bound_cents.filter(|b| *b != 0),
            ..self
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if let Some(p) = self.percent {
            if !(0.0..=100.0).contains(&p) {
                return Err(format!("Rate must be between 0 and 100 (got {})", p));
            }
        }
        if let Some(flat) = self.flat_cents {
            if flat < 0 {
                return Err("Flat fee cannot be negative".to_string());
            }
        }
        if let (Some(lower), Some(upper)) = (self.lower_bound_cents, self.upper_bound_cents) {
            if lower > upper {
                return Err(format!(
                    "Lower bound {} exceeds upper bound {}",
                    lower, upper
                ));
            }
        }
        Ok(())
    }

    pub fn percent_label(&self) -> String {
        self.percent.map(|p| p.to_string()).unwrap_or_default()
    }
}

/// Sanitizes and validates a whole schedule before it is saved.
pub fn prepare_schedule(
    fees: Vec<RoomFeeScheduleInput>,
) -> Result<Vec<RoomFeeScheduleInput>, String> {
    let fees: Vec<_> = fees.into_iter().map(RoomFeeScheduleInput::sanitized).collect();
    for (i, fee) in fees.iter().enumerate() {
        fee.validate().map_err(|e| format!("Row {}: {}", i + 1, e))?;
    }
    Ok(fees)
}

/// Display order: table time before streaming, then by lower bound.
pub fn sort_schedule(fees: &mut [RoomFeeScheduleInput]) {
    fees.sort_by_key(|f| (f.revenue_type.sort_rank(), f.lower_bound_cents.unwrap_or(0)));
}
