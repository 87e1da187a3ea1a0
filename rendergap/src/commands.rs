use clap::{arg, command};

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("rendergap")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("rendergap")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .subcommand_required(false)
        .subcommand(
            command!("audit")
                .about(
                    "Render each site with and without JavaScript and report how much of its \
                text a non-rendering crawler can read.",
                )
                .arg(
                    arg!(-i --"input" <PATH>)
                        .required(false)
                        .help("CSV file with a `url` column listing the sites to audit")
                        .value_parser(clap::value_parser!(String))
                        .default_value("sites.csv"),
                )
                .arg(
                    arg!(-o --"output-dir" <DIR>)
                        .required(false)
                        .help("Directory for the results CSV and the per-site reports")
                        .value_parser(clap::value_parser!(String))
                        .default_value("."),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: html, markdown, text, json")
                        .value_parser(["html", "markdown", "md", "text", "json"])
                        .default_value("html"),
                )
                .arg(
                    arg!(--"rate-limit" <REQUESTS>)
                        .required(false)
                        .help("Maximum sitemap requests per minute across all sites")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("30"),
                )
                .arg(
                    arg!(--"settle-ms" <MILLIS>)
                        .required(false)
                        .help("Extra wait after the network goes idle before capturing the rendered page")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("2000"),
                )
                .arg(
                    arg!(--"chrome" <PATH>)
                        .required(false)
                        .help("Chrome/Chromium executable (default: autodetect)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                ),
        )
}
