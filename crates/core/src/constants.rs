/// Maximum number of operations kept in the ledger (oldest dropped first)
pub const DEFAULT_LEDGER_CAP: usize = 200;

/// Hour (fund-market local time) at which the daily order cutoff falls
pub const DEFAULT_CUTOFF_HOUR: u32 = 15;

/// Fund-market timezone
pub const DEFAULT_MARKET_TZ: &str = "Asia/Shanghai";

/// Decimal places for money values (amount, profit, fee) and shares
pub const DISPLAY_DECIMAL_PRECISION: u32 = 2;

/// Decimal places for unit cost price
pub const COST_PRICE_DECIMAL_PRECISION: u32 = 4;

/// Storage key for the operation ledger
pub const OPERATIONS_STORAGE_KEY: &str = "fund_operations";

/// Storage key for current holdings
pub const HOLDINGS_STORAGE_KEY: &str = "fund_holdings";

/// Storage key for the tracked fund selection
pub const SELECTION_STORAGE_KEY: &str = "fund_selection";

/// Storage key for per-fund replay baselines left behind by ledger truncation
pub const BASELINES_STORAGE_KEY: &str = "fund_baselines";
