use std::{process::ExitCode, sync::Arc};

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use rust_decimal::Decimal;
use serde::Serialize;
use stockroom::{
    config::{self, AppConfig},
    db::{self, DbPool},
    entities::{ProductModel, SaleModel},
    services::{InventoryServices, NewProduct, ProductUpdate},
    ServiceError,
};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let context = CliContext::initialize(skips_auto_migrate(&cli.command)).await?;

    let outcome = match cli.command {
        Commands::Init => handle_init(&context).await,
        Commands::Add(args) => handle_add(&context, args, cli.json).await,
        Commands::Edit(args) => handle_edit(&context, args).await,
        Commands::Delete(args) => handle_delete(&context, args).await,
        Commands::List => handle_list(&context, cli.json).await,
        Commands::Search(args) => handle_search(&context, args, cli.json).await,
        Commands::LowStock => handle_low_stock(&context, cli.json).await,
        Commands::Sell(args) => handle_sell(&context, args, cli.json).await,
        Commands::History(args) => handle_history(&context, args, cli.json).await,
    };

    db::close_pool(context.into_pool())
        .await
        .context("failed to close database pool")?;

    match outcome {
        Ok(code) => Ok(code),
        Err(err) => match err.downcast_ref::<ServiceError>() {
            Some(service_err) if service_err.is_client_error() => {
                eprintln!("{}", service_err);
                Ok(ExitCode::FAILURE)
            }
            _ => Err(err),
        },
    }
}

/// `init` runs the migrations itself in `handle_init`.
fn skips_auto_migrate(command: &Commands) -> bool {
    matches!(command, Commands::Init)
}

#[derive(Parser)]
#[command(name = "stockroom", about = "Inventory tracker: products, stock levels and sales", version)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON when available"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database tables
    Init,
    /// Add a new product to inventory
    Add(AddArgs),
    /// Edit an existing product
    Edit(EditArgs),
    /// Delete a product from inventory
    Delete(DeleteArgs),
    /// List all products in inventory
    List,
    /// Search products by name, description or category
    Search(SearchArgs),
    /// List products at or below their low-stock threshold
    LowStock,
    /// Record a sale and deduct stock
    Sell(SellArgs),
    /// Show recorded sales, most recent first
    History(HistoryArgs),
}

#[derive(Args)]
struct AddArgs {
    #[arg(long, help = "Product name")]
    name: String,
    #[arg(long, help = "Product description")]
    description: String,
    #[arg(long, help = "Unit price (e.g. 9.99)")]
    price: Decimal,
    #[arg(long = "stock", help = "Current stock quantity")]
    stock_quantity: i32,
    #[arg(long, help = "Product category")]
    category: String,
    #[arg(long, help = "Low-stock threshold (defaults to the configured value)")]
    threshold: Option<i32>,
}

#[derive(Args)]
struct EditArgs {
    #[arg(long, help = "Product ID to edit")]
    id: i32,
    #[arg(long, help = "New product name")]
    name: Option<String>,
    #[arg(long, help = "New product description")]
    description: Option<String>,
    #[arg(long, help = "New unit price")]
    price: Option<Decimal>,
    #[arg(long = "stock", help = "New stock quantity")]
    stock_quantity: Option<i32>,
    #[arg(long, help = "New product category")]
    category: Option<String>,
    #[arg(long, help = "New low-stock threshold")]
    threshold: Option<i32>,
}

#[derive(Args)]
struct DeleteArgs {
    #[arg(long, help = "Product ID to delete")]
    id: i32,
}

#[derive(Args)]
struct SearchArgs {
    #[arg(help = "Text to look for in name, description or category")]
    term: String,
}

#[derive(Args)]
struct SellArgs {
    #[arg(long, help = "Product ID to sell")]
    id: i32,
    #[arg(long, help = "Number of units sold")]
    quantity: i32,
    #[arg(long, help = "Unit price charged; defaults to the product's current price")]
    price: Option<Decimal>,
}

#[derive(Args)]
struct HistoryArgs {
    #[arg(long, help = "Only show sales of this product")]
    product_id: Option<i32>,
}

struct CliContext {
    _config: AppConfig,
    db: Arc<DbPool>,
    services: InventoryServices,
}

impl CliContext {
    async fn initialize(skip_auto_migrate: bool) -> Result<Self> {
        let config = config::load_config().context("failed to load application config")?;
        config::init_tracing(config.log_level(), config.log_json);

        let db_pool = db::establish_connection_from_app_config(&config)
            .await
            .context("failed to connect to database")?;
        db::check_connection(&db_pool)
            .await
            .context("database is not reachable")?;

        if config.auto_migrate && !skip_auto_migrate {
            db::run_migrations(&db_pool)
                .await
                .context("failed to run database migrations")?;
        }

        let db = Arc::new(db_pool);
        let services = InventoryServices::new(db.clone(), &config);

        Ok(Self {
            _config: config,
            db,
            services,
        })
    }

    /// Releases the services and hands back the pool for closing.
    fn into_pool(self) -> DbPool {
        drop(self.services);
        Arc::try_unwrap(self.db).unwrap_or_else(|shared| (*shared).clone())
    }
}

async fn handle_init(context: &CliContext) -> Result<ExitCode> {
    db::run_migrations(&context.db)
        .await
        .context("failed to initialize database")?;
    println!("Database initialized successfully!");
    Ok(ExitCode::SUCCESS)
}

async fn handle_add(context: &CliContext, args: AddArgs, json: bool) -> Result<ExitCode> {
    let product = context
        .services
        .catalog
        .add(NewProduct {
            name: args.name,
            description: args.description,
            price: args.price,
            stock_quantity: args.stock_quantity,
            category: args.category,
            low_stock_threshold: args.threshold,
        })
        .await?;

    if json {
        print_json(&product)?;
    } else {
        println!(
            "Product '{}' added successfully! (ID: {})",
            product.name, product.id
        );
    }
    Ok(ExitCode::SUCCESS)
}

async fn handle_edit(context: &CliContext, args: EditArgs) -> Result<ExitCode> {
    let changes = ProductUpdate {
        name: args.name,
        description: args.description,
        price: args.price,
        stock_quantity: args.stock_quantity,
        category: args.category,
        low_stock_threshold: args.threshold,
    };

    if context.services.catalog.edit(args.id, changes).await? {
        println!("Product (ID: {}) updated successfully!", args.id);
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("Product with ID {} not found!", args.id);
        Ok(ExitCode::FAILURE)
    }
}

async fn handle_delete(context: &CliContext, args: DeleteArgs) -> Result<ExitCode> {
    if context.services.catalog.delete(args.id).await? {
        println!("Product (ID: {}) deleted successfully!", args.id);
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("Product with ID {} not found!", args.id);
        Ok(ExitCode::FAILURE)
    }
}

async fn handle_list(context: &CliContext, json: bool) -> Result<ExitCode> {
    let products = context.services.catalog.list().await?;
    render_products(&products, json, "No products found in inventory!")?;
    Ok(ExitCode::SUCCESS)
}

async fn handle_search(context: &CliContext, args: SearchArgs, json: bool) -> Result<ExitCode> {
    let products = context.services.catalog.search(&args.term).await?;
    render_products(
        &products,
        json,
        &format!("No products matching '{}'", args.term),
    )?;
    Ok(ExitCode::SUCCESS)
}

async fn handle_low_stock(context: &CliContext, json: bool) -> Result<ExitCode> {
    let products = context.services.catalog.low_stock().await?;
    render_products(&products, json, "No products are low on stock.")?;
    Ok(ExitCode::SUCCESS)
}

async fn handle_sell(context: &CliContext, args: SellArgs, json: bool) -> Result<ExitCode> {
    let sale = context
        .services
        .sales
        .sell(args.id, args.quantity, args.price)
        .await?;

    if json {
        print_json(&sale)?;
    } else {
        println!(
            "Sold {} unit(s) of product {} at ${:.2} (sale ID: {}, total ${:.2})",
            sale.quantity,
            sale.product_id,
            sale.sale_price,
            sale.id,
            sale.total()
        );
    }
    Ok(ExitCode::SUCCESS)
}

async fn handle_history(context: &CliContext, args: HistoryArgs, json: bool) -> Result<ExitCode> {
    let sales = context.services.ledger.history(args.product_id).await?;

    if json {
        print_json(&sales)?;
    } else if sales.is_empty() {
        println!("No sales recorded.");
    } else {
        render_sales(&sales);
    }
    Ok(ExitCode::SUCCESS)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn render_products(products: &[ProductModel], json: bool, empty_message: &str) -> Result<()> {
    if json {
        return print_json(&products);
    }
    if products.is_empty() {
        println!("{}", empty_message);
        return Ok(());
    }

    let rows: Vec<Vec<String>> = products
        .iter()
        .map(|p| {
            vec![
                p.id.to_string(),
                p.name.clone(),
                p.description.clone(),
                format!("${:.2}", p.price),
                p.stock_quantity.to_string(),
                p.low_stock_threshold.to_string(),
                p.category.clone(),
            ]
        })
        .collect();
    render_table(
        &["ID", "Name", "Description", "Price", "Stock", "Threshold", "Category"],
        &[3, 4],
        &rows,
    );
    Ok(())
}

fn render_sales(sales: &[SaleModel]) {
    let rows: Vec<Vec<String>> = sales
        .iter()
        .map(|s| {
            vec![
                s.id.to_string(),
                s.product_id.to_string(),
                s.quantity.to_string(),
                format!("${:.2}", s.sale_price),
                format!("${:.2}", s.total()),
                s.sale_date.format("%Y-%m-%d %H:%M:%S").to_string(),
            ]
        })
        .collect();
    render_table(
        &["ID", "Product", "Qty", "Price", "Total", "Date"],
        &[2, 3, 4],
        &rows,
    );
}

/// Plain-text table; columns listed in `right_aligned` are right-justified.
fn render_table(headers: &[&str], right_aligned: &[usize], rows: &[Vec<String>]) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let format_row = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                if right_aligned.contains(&i) {
                    format!("{:>width$}", cell, width = widths[i])
                } else {
                    format!("{:<width$}", cell, width = widths[i])
                }
            })
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    println!("{}", format_row(headers.to_vec()));
    println!(
        "{}",
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("  ")
    );
    for row in rows {
        println!("{}", format_row(row.iter().map(String::as_str).collect()));
    }
}
