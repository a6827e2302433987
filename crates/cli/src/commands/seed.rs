use crate::commands::{prepare, CommandResult};
use hireflow_core::ledger::BudgetLedger;
use hireflow_db::{connect_with_config, migrations, seed_demo, HiringService, SeedSummary};

pub fn run() -> CommandResult {
    let (config, runtime) = match prepare("seed") {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = connect_with_config(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let service =
            HiringService::sqlite(pool.clone(), BudgetLedger::new(config.ledger.debit_rate));
        let summary = seed_demo(&service)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 6u8));

        pool.close().await;
        summary
    });

    match result {
        Ok(summary) => CommandResult::success("seed", describe(&summary)),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

fn describe(summary: &SeedSummary) -> String {
    if summary.skipped {
        return "demo data already present; nothing written".to_string();
    }
    format!(
        "seeded {} users and {} hiring requests across every pipeline stage",
        summary.users, summary.requests
    )
}

#[cfg(test)]
mod tests {
    use hireflow_db::SeedSummary;

    use super::describe;

    #[test]
    fn describes_fresh_and_skipped_runs() {
        let fresh = SeedSummary { users: 5, requests: 8, skipped: false };
        assert_eq!(
            describe(&fresh),
            "seeded 5 users and 8 hiring requests across every pipeline stage"
        );

        let skipped = SeedSummary { skipped: true, ..SeedSummary::default() };
        assert_eq!(describe(&skipped), "demo data already present; nothing written");
    }
}
