use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;
use rust_decimal::Decimal;
use time::{Date, Duration, OffsetDateTime, Weekday};

use budget_planner::{
    CategoryName, FrequencyRule, Transaction, TransactionSource, create_transaction,
    create_user, ensure_default_budget_goals, get_or_create_category, initialize_db,
    project_recurring,
};

/// A utility for creating a test database for the budget planner server.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,

    /// Email address of the test user.
    #[arg(long, default_value = "test@example.com")]
    email: String,
}

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    if output_path
        .extension()
        .is_none_or(|extension| extension.is_empty())
    {
        eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
        exit(1);
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    println!("Creating test user...");
    let user = create_user(&args.email, &conn)?;

    let today = OffsetDateTime::now_utc().date();
    let month_start = today.replace_day(1)?;

    println!("Creating recurring transactions...");
    let housing = get_or_create_category(user.id, &CategoryName::new("Housing")?, &conn)?;
    let rent = create_transaction(
        Transaction::build(user.id, Decimal::from(-1800), month_start, "Rent")
            .category_id(Some(housing.id))
            .recurring(FrequencyRule::monthly(1)?, None),
        &conn,
    )?;
    let instances = project_recurring(&rent, &conn)?;
    println!("Generated {} rent payments", instances.len());

    let income = get_or_create_category(user.id, &CategoryName::new("Salary")?, &conn)?;
    let pay_day = next_weekday(month_start, Weekday::Friday);
    let salary = create_transaction(
        Transaction::build(user.id, Decimal::from(2500), pay_day, "Salary")
            .category_id(Some(income.id))
            .recurring(FrequencyRule::weekly(Weekday::Friday), None),
        &conn,
    )?;
    let instances = project_recurring(&salary, &conn)?;
    println!("Generated {} pay days", instances.len());

    println!("Creating one-off transactions...");
    let groceries = get_or_create_category(user.id, &CategoryName::new("Groceries")?, &conn)?;
    let coffee = get_or_create_category(user.id, &CategoryName::new("Coffee")?, &conn)?;
    for days_ago in 0..28 {
        let date = today - Duration::days(days_ago);

        let (category, amount, description) = match days_ago % 7 {
            0 => (&groceries, Decimal::new(-14250, 2), "Weekly shop"),
            3 => (&groceries, Decimal::new(-2380, 2), "Top up shop"),
            _ => (&coffee, Decimal::new(-550, 2), "Flat white"),
        };

        let source = if days_ago % 2 == 0 {
            TransactionSource::Imported
        } else {
            TransactionSource::Manual
        };

        create_transaction(
            Transaction::build(user.id, amount, date, description)
                .category_id(Some(category.id))
                .source(source),
            &conn,
        )?;
    }

    println!("Creating default budget goals...");
    let goal_count = ensure_default_budget_goals(user.id, &conn)?;
    println!("Created {goal_count} budget goals");

    println!("Success! The test user's ID is {}", user.id);

    Ok(())
}

/// The first `weekday` on or after `date`.
fn next_weekday(date: Date, weekday: Weekday) -> Date {
    let mut date = date;

    while date.weekday() != weekday {
        date = date.next_day().unwrap_or(date);
    }

    date
}
