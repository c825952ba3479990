//! Database views for analytical queries.

use ::duckdb::Connection;

/// Create database views over the result tables.
///
/// - `vw_gap_daily`: per contract and calendar day, observation count and mean gaps
/// - `vw_significant_fields`: significance rows with `p_value < 0.05`, starred
///
/// # Errors
/// Returns an error if the view creation SQL fails to execute.
pub fn create_views(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch(
        r"
CREATE OR REPLACE VIEW vw_gap_daily AS
SELECT
    contract,
    CAST(ts AS DATE) AS date,
    COUNT(*) AS observations,
    AVG(gap_open) AS mean_gap_open,
    AVG(gap_close) AS mean_gap_close,
    MIN(gap_low) AS min_gap_low,
    MAX(gap_high) AS max_gap_high
FROM gap_series
GROUP BY contract, CAST(ts AS DATE);

CREATE OR REPLACE VIEW vw_significant_fields AS
SELECT
    run_id,
    contract,
    family,
    field,
    n,
    mean,
    t_stat,
    p_value,
    CASE
        WHEN p_value < 0.01 THEN '***'
        ELSE '**'
    END AS stars
FROM significance_results
WHERE p_value IS NOT NULL AND p_value < 0.05;
",
    )?;

    Ok(())
}
