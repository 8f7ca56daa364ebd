/// Fund code as issued by the fund market (e.g. "110022")
pub type FundCode = String;
