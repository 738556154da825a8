use toy2class::*;

use clap::error::ErrorKind;
use clap::{crate_version, value_parser, Arg, ArgAction, Command};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::process;

fn main() -> Result<(), translate::Error> {
    env_logger::init();

    let mut command = Command::new("Toy language to class compiler")
        .version(crate_version!())
        .about("Compiles a toy line-oriented language into a JVM class that prints its output")
        .arg(
            Arg::new("output class")
                .long("output-class")
                .value_name("CLASS_NAME")
                .default_value(translate::Settings::DEFAULT_CLASS_NAME)
                .help("Binary name of the generated class (eg. `me/example/Hello`)"),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .value_name("FILE")
                .help("Where to write the class file (defaults to `<CLASS_NAME>.class`)"),
        )
        .arg(
            Arg::new("lenient")
                .long("lenient")
                .action(ArgAction::SetTrue)
                .help("Skip lines that can't be parsed instead of failing"),
        )
        .arg(
            Arg::new("max depth")
                .long("max-depth")
                .value_name("DEPTH")
                .value_parser(value_parser!(usize))
                .help("Maximum nesting of `then`, `else`, `do`, and `call`"),
        )
        .arg(
            Arg::new("dump")
                .long("dump")
                .action(ArgAction::SetTrue)
                .help("Print the generated class in a `javap`-like format"),
        )
        .arg(
            Arg::new("jar")
                .long("jar")
                .value_name("JAR")
                .help("Also package the class into an executable JAR (needs `jar` on the path)"),
        )
        .arg(
            Arg::new("INPUT")
                .help("Sets the input source file to use")
                .required(true)
                .index(1),
        );
    let matches = command.get_matches_mut();

    let class_name = matches
        .get_one::<String>("output class")
        .map(String::as_str)
        .unwrap_or(translate::Settings::DEFAULT_CLASS_NAME);
    let mut settings = translate::Settings::new(class_name)?;
    settings.strict_syntax = !matches.get_flag("lenient");
    if let Some(depth) = matches.get_one::<usize>("max depth") {
        settings.max_nesting_depth = *depth;
    }

    let class_file = matches
        .get_one::<String>("output")
        .cloned()
        .unwrap_or_else(|| format!("{}.class", class_name));
    let jar_entry = format!("{}.class", class_name);
    let jar_directory = match matches.get_one::<String>("jar") {
        None => None,
        Some(_) => Some(jar_root(&class_file, &jar_entry).unwrap_or_else(|| {
            command
                .error(
                    ErrorKind::ArgumentConflict,
                    format!("`--jar` requires the output file to end in `{}`", jar_entry),
                )
                .exit()
        })),
    };

    let source_file = matches
        .get_one::<String>("INPUT")
        .map(String::as_str)
        .unwrap_or_default();
    log::info!("Reading and translating '{}'", source_file);
    let reader = BufReader::new(File::open(source_file)?);
    let mut translator = translate::ProgramTranslator::new(settings)?;
    for line in reader.lines() {
        translator.parse_line(&line?)?;
    }
    let class = translator.result()?;

    // Write out the results
    log::info!("Writing '{}'", class_file);
    class
        .save_to_path(&class_file, true)
        .map_err(jvm::Error::IoError)?;

    if matches.get_flag("dump") {
        print!("{}", class.dump()?);
    }

    let jar_file = matches.get_one::<String>("jar");
    if let (Some(jar_file), Some(jar_directory)) = (jar_file, jar_directory) {
        let main_class = class_name.replace('/', ".");
        log::info!("Packaging '{}' into '{}'", jar_entry, jar_file);
        let status = process::Command::new("jar")
            .arg("cfe")
            .arg(jar_file)
            .arg(&main_class)
            .arg("-C")
            .arg(jar_directory)
            .arg(&jar_entry)
            .status()?;
        if !status.success() {
            log::error!("`jar` exited with {}", status);
            process::exit(status.code().unwrap_or(1));
        }
    }

    Ok(())
}

/// Directory to hand to `jar -C` so that the class is stored under `jar_entry`
///
/// The JAR entry has to match the binary name of the class, so this is `None` unless
/// `class_file` ends with the entry.
fn jar_root<'a>(class_file: &'a str, jar_entry: &str) -> Option<&'a str> {
    match class_file.strip_suffix(jar_entry)? {
        "" => Some("."),
        root if root.ends_with('/') => Some(root),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jar_root_follows_binary_name() {
        assert_eq!(jar_root("Program.class", "Program.class"), Some("."));
        assert_eq!(jar_root("build/Program.class", "Program.class"), Some("build/"));
        assert_eq!(
            jar_root("out/me/example/Hello.class", "me/example/Hello.class"),
            Some("out/")
        );
        assert_eq!(jar_root("build/x.class", "Program.class"), None);
        assert_eq!(jar_root("build/MyProgram.class", "Program.class"), None);
    }
}
