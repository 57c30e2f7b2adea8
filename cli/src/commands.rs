//! Command handlers

use crate::cli::{Cli, Commands};
use crate::state::AppState;
use anyhow::{bail, Result};
use cart_sync::{SyncOutcome, SyncState, SyncStatus};
use catalog::{CatalogOrigin, PriceSort, ProductQuery};
use model::{Cart, CartChange, ProductId};
use std::time::Duration;

pub async fn run(cli: Cli) -> Result<()> {
    let state = AppState::open(&cli.data_dir, cli.offline).await?;

    let result = match cli.command {
        Commands::Products {
            search,
            category,
            sort,
            page,
        } => products(&state, search, category, sort, page).await,
        Commands::Add { product_id, qty } => add(&state, product_id, qty).await,
        Commands::Set { product_id, qty } => {
            report_change(product_id, state.cart.update_quantity(product_id, qty));
            print_cart(&state.cart.snapshot());
            Ok(())
        }
        Commands::Remove { product_id } => {
            report_change(product_id, state.cart.remove_from_cart(product_id));
            print_cart(&state.cart.snapshot());
            Ok(())
        }
        Commands::Show => {
            show(&state);
            Ok(())
        }
        Commands::Clear => {
            state.cart.clear_cart();
            println!("Cart cleared");
            Ok(())
        }
        Commands::Sync { clear_after } => sync(&state, clear_after).await,
        Commands::Watch => watch(&state).await,
    };

    state.shutdown().await;
    result
}

async fn products(
    state: &AppState,
    search: Option<String>,
    category: Option<String>,
    sort: PriceSort,
    page: usize,
) -> Result<()> {
    let origin = state.catalog.refresh().await?;
    if origin == CatalogOrigin::Cache {
        println!("(offline: showing cached catalog)");
    }

    let mut query = ProductQuery::new()
        .with_sort(sort)
        .with_page(page)
        .with_page_size(state.settings.catalog.page_size);
    if let Some(search) = search {
        query = query.with_search(search);
    }
    if let Some(category) = category {
        query = query.with_category(category);
    }

    let result = state.catalog.query(&query);
    if result.items.is_empty() {
        println!("No products found");
    }
    for product in &result.items {
        println!(
            "{:>5}  {:<32} {:>10}  {}",
            product.id, product.name, product.price, product.category
        );
    }
    println!(
        "Page {}/{} ({} products) | Categories: {}",
        result.page,
        result.total_pages.max(1),
        result.total_items,
        state.catalog.categories().join(", ")
    );
    Ok(())
}

async fn add(state: &AppState, product_id: ProductId, qty: u32) -> Result<()> {
    if qty == 0 {
        bail!("Quantity must be at least 1");
    }

    state.catalog.refresh().await?;
    let Some(product) = state.catalog.product(product_id) else {
        bail!(
            "Unknown product {}; run `cartsync products` while online to load the catalog",
            product_id
        );
    };

    match state.cart.add_product(&product, qty) {
        CartChange::Merged(total) => println!("{} now x{}", product.name, total),
        _ => println!("Added {} x{}", product.name, qty),
    }
    print_cart(&state.cart.snapshot());
    Ok(())
}

fn show(state: &AppState) {
    print_cart(&state.cart.snapshot());

    let persistence = state.cart.persistence();
    if let Some(error) = persistence.last_error {
        println!("Warning: last local save failed: {}", error);
    }
    println!(
        "Connectivity: {}",
        if state.connectivity.is_online() {
            "online"
        } else {
            "offline"
        }
    );
}

async fn sync(state: &AppState, clear_after: bool) -> Result<()> {
    let _progress = state.orchestrator.subscribe(print_sync_state);

    match state.orchestrator.sync().await {
        Ok(SyncOutcome::Synced {
            order_id,
            item_count,
        }) => {
            if let Some(order_id) = order_id {
                println!("Order {} accepted ({} lines)", order_id, item_count);
            }
            if clear_after {
                state.orchestrator.clear_cart_after_sync();
            }
            Ok(())
        }
        Ok(SyncOutcome::NothingToSync) => Ok(()),
        Ok(SyncOutcome::AlreadyRunning) => {
            println!("A sync is already running");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

async fn watch(state: &AppState) -> Result<()> {
    let _progress = state.orchestrator.subscribe(print_sync_state);
    let _connectivity = state.connectivity.subscribe(|online| {
        println!("Connectivity: {}", if online { "online" } else { "offline" });
    });
    let _cart = state.cart.subscribe(|cart| {
        println!(
            "Cart: {} lines, {} items, total {}",
            cart.line_count(),
            cart.item_count(),
            cart.total_price()
        );
    });

    let auto_sync = if state.settings.sync.auto_sync {
        Some(state.orchestrator.start_auto_sync()?)
    } else {
        None
    };

    let probe_task = state.probe.clone().map(|probe| {
        let interval = Duration::from_millis(state.settings.connectivity.probe_interval_ms);
        state.connectivity.spawn_probe(probe, interval)
    });

    if state.connectivity.is_online() && !state.cart.is_empty() && auto_sync.is_some() {
        // Anything left from an earlier offline session goes out now.
        if let Err(e) = state.orchestrator.sync().await {
            tracing::warn!("Initial sync failed: {}", e);
        }
    }

    println!("Watching; press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;

    if let Some(task) = probe_task {
        task.abort();
    }
    drop(auto_sync);
    Ok(())
}

fn report_change(product_id: ProductId, change: CartChange) {
    match change {
        CartChange::Unchanged => println!("Product {} is not in the cart", product_id),
        CartChange::Removed => println!("Removed product {}", product_id),
        _ => println!("Updated product {}", product_id),
    }
}

fn print_cart(cart: &Cart) {
    if cart.is_empty() {
        println!("Cart is empty");
        return;
    }
    for line in cart.lines() {
        println!(
            "{:>5}  {:<32} {:>4} x {:>10} = {:>10}",
            line.product_id,
            line.name,
            line.quantity,
            line.price,
            line.subtotal()
        );
    }
    println!(
        "{} items, total {}",
        cart.item_count(),
        cart.total_price()
    );
}

fn print_sync_state(state: &SyncState) {
    let marker = match state.status {
        SyncStatus::Idle => "-",
        SyncStatus::Syncing => "~",
        SyncStatus::Success => "+",
        SyncStatus::Error => "!",
    };
    println!("[{}] {}", marker, state.message);
}
