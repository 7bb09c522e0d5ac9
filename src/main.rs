mod cli;

use cli::{Args, Command};
use fmcg_dashboard::{Dashboard, FileSource};

fn main() {
    let args = Args::parse_args();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(args.log_filter()))
        .init();
    log::debug!("arguments: {args:?}");

    let dashboard = Dashboard::new(FileSource::new(&args.data));
    let response = match &args.command {
        Command::Filters => dashboard.handle_filter_options(),
        Command::ChartData { query } => dashboard.handle_chart_data(query),
    };

    if args.pretty {
        println!("{}", response.to_json_pretty());
    } else {
        println!("{}", response.to_json());
    }

    if !response.is_success() {
        std::process::exit(1);
    }
}
