extern crate clap;
extern crate contextual_nlu;
extern crate env_logger;
extern crate serde;
extern crate serde_json;

use clap::{App, Arg};
use contextual_nlu::{EntityDefinition, IntentDefinition, NluEngine, TrainingOptions};
use serde::Deserialize;
use std::fs;
use std::io;
use std::io::Write;

#[derive(Deserialize)]
struct Dataset {
    intents: Vec<IntentDefinition>,
    #[serde(default)]
    entities: Vec<EntityDefinition>,
}

fn main() {
    env_logger::Builder::from_default_env()
        .default_format_timestamp_nanos(true)
        .init();

    let matches = App::new("contextual-nlu-train")
        .about("Contextual NLU interactive CLI for training a bot and predicting intents")
        .arg(
            Arg::with_name("DATASET")
                .required(true)
                .takes_value(true)
                .index(1)
                .help("path to the json dataset with intents and entities definitions"),
        )
        .arg(
            Arg::with_name("language")
                .short("l")
                .long("--language")
                .takes_value(true)
                .help("language to train, defaults to 'en'"),
        )
        .arg(
            Arg::with_name("contexts")
                .short("c")
                .long("--contexts")
                .takes_value(true)
                .help("comma separated list of contexts to predict in"),
        )
        .arg(
            Arg::with_name("model_output")
                .short("o")
                .long("--model-output")
                .takes_value(true)
                .help("path where the trained model is written as json"),
        )
        .get_matches();
    let dataset_path = matches.value_of("DATASET").unwrap();
    let language = matches.value_of("language").unwrap_or("en");
    let contexts: Vec<String> = matches
        .value_of("contexts")
        .map(|v| v.split(',').map(|ctx| ctx.trim().to_string()).collect())
        .unwrap_or_else(Vec::new);

    let dataset: Dataset =
        serde_json::from_reader(fs::File::open(dataset_path).unwrap()).unwrap();

    println!("\nTraining the nlu engine...");
    let engine = NluEngine::builder("interactive-cli", language).build();
    let model = engine
        .train_and_load(
            &dataset.intents,
            &dataset.entities,
            language,
            None,
            TrainingOptions::default(),
        )
        .unwrap();
    if !model.success {
        println!("Training failed, only entities will be extracted");
        engine.load_model(model.clone()).unwrap();
    }
    if let Some(path) = matches.value_of("model_output") {
        fs::write(path, serde_json::to_string(&model).unwrap()).unwrap();
    }

    loop {
        print!("> ");
        io::stdout().flush().unwrap();
        let mut query = String::new();
        io::stdin().read_line(&mut query).unwrap();
        let result = engine.predict(query.trim(), &contexts).unwrap();
        let result_json = serde_json::to_string_pretty(&result).unwrap();
        println!("{}", result_json);
    }
}
