use crate::cli::args::CliArgs;

pub const MAX_PAGE_SIZE: usize = 100;

pub fn validate(args: &CliArgs) -> Result<(), String> {
    if let Some(page_size) = args.page_size {
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(format!("invalid page-size, expected 1 to {MAX_PAGE_SIZE}"));
        }
    }
    if let Some(raw) = args.policy.as_deref() {
        crate::selection::BulkPolicy::parse(raw)
            .ok_or_else(|| format!("invalid --policy '{raw}', expected reset or merge"))?;
    }
    if let Some(rate) = args.rate {
        if rate == 0 {
            return Err("invalid rate, expected positive integer".to_string());
        }
    }
    if let Some(timeout) = args.timeout {
        if timeout == 0 {
            return Err("invalid timeout, expected positive integer".to_string());
        }
    }
    if let Some(raw) = args.select.as_deref() {
        crate::intake::parse_count(raw).map_err(|e| format!("invalid --select: {e}"))?;
    }
    if let Some(raw) = args.base_url.as_deref() {
        reqwest::Url::parse(raw).map_err(|e| format!("invalid --base-url '{raw}': {e}"))?;
    }
    Ok(())
}
