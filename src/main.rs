fn main() {
    if let Err(err) = covid_loader::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
