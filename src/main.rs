use std::error::Error;
use std::{env, fs};

use subnet_planner::codec::{to_share_url, IdentityCompressor};
use subnet_planner::output::{build_rows, parent_row, print_outcome, print_table};
use subnet_planner::processing::{audit_tree, plan_and_apply, SortOrder};
use subnet_planner::{Ipv4, OperatingMode, SubnetTree};

fn main() -> Result<(), Box<dyn Error>> {
    // Do as little as possible in main.rs as it can't contain any tests
    log4rs::init_file("log4rs.yml", Default::default()).expect("Error initializing log4rs");
    dotenv::dotenv().ok();
    //
    log::info!("#Start main()");

    let args: Vec<String> = env::args().collect();
    let Some(base_arg) = args.get(1) else {
        eprintln!(
            "Usage: {} <network>/<size> [requests-file [padding [alignment [sort-order]]]]",
            args.first().map(String::as_str).unwrap_or("subnet-planner")
        );
        std::process::exit(2);
    };

    let base = Ipv4::new(base_arg)?;
    let mode: OperatingMode = match env::var("SUBNET_PLANNER_MODE") {
        Ok(value) => value.parse()?,
        Err(_) => OperatingMode::default(),
    };
    log::info!("base network {base}, operating mode {mode}");

    let tree = match args.get(2) {
        Some(requests_file) => {
            let requests_text = fs::read_to_string(requests_file)?;
            let padding = args.get(3).map(String::as_str).unwrap_or("");
            let alignment = args.get(4).map(String::as_str).unwrap_or("");
            let sort: SortOrder = match args.get(5) {
                Some(value) => value.parse()?,
                None => SortOrder::default(),
            };

            let (tree, outcome) =
                plan_and_apply(base, &requests_text, padding, alignment, false, sort, mode)?;
            print_outcome(&outcome);
            println!();
            tree
        }
        None => SubnetTree::new(&base.addr.to_string(), base.mask)?,
    };

    let mut rows = vec![parent_row(&tree, mode)];
    rows.extend(build_rows(&tree, mode));
    print_table(&rows);

    let analysis = audit_tree(&tree);
    println!(
        "\n{} subnets, {} of {} addresses allocated ({:.1}%)",
        analysis.total_subnets,
        analysis.allocated_addresses,
        analysis.total_addresses,
        analysis.utilization_percent
    );
    println!(
        "Share URL parameter: c={}",
        to_share_url(&tree, mode, &IdentityCompressor)
    );

    Ok(())
}
