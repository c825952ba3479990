use ::duckdb::Connection;

struct Migration {
    version: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "0001_result_tables",
        sql: r#"
CREATE TABLE IF NOT EXISTS gap_series (
    contract TEXT NOT NULL,
    ts TIMESTAMP NOT NULL,
    gap_open DOUBLE,
    gap_high DOUBLE,
    gap_low DOUBLE,
    gap_close DOUBLE,
    updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    PRIMARY KEY(contract, ts)
);

CREATE TABLE IF NOT EXISTS significance_results (
    run_id TEXT NOT NULL,
    contract TEXT NOT NULL,
    family TEXT NOT NULL,
    field TEXT NOT NULL,
    n BIGINT NOT NULL,
    mean DOUBLE,
    std_dev DOUBLE,
    std_err DOUBLE,
    t_stat DOUBLE,
    p_value DOUBLE,
    created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    PRIMARY KEY(run_id, contract, field)
);

CREATE TABLE IF NOT EXISTS run_log (
    run_id TEXT NOT NULL,
    contract TEXT NOT NULL,
    status TEXT NOT NULL,
    records BIGINT NOT NULL,
    message TEXT,
    logged_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    },
    Migration {
        version: "0002_indexes",
        sql: r#"
CREATE INDEX IF NOT EXISTS idx_significance_contract ON significance_results(contract);
CREATE INDEX IF NOT EXISTS idx_run_log_run ON run_log(run_id);
"#,
    },
];

pub fn apply_migrations(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version TEXT PRIMARY KEY,
    applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    )?;

    for migration in MIGRATIONS {
        let applied_count: i64 = connection.query_row(
            "SELECT COUNT(*) FROM schema_migrations WHERE version = ?",
            [migration.version],
            |row| row.get(0),
        )?;

        if applied_count == 0 {
            connection.execute_batch(migration.sql)?;
            connection.execute(
                "INSERT INTO schema_migrations (version) VALUES (?)",
                [migration.version],
            )?;
        }
    }

    Ok(())
}
