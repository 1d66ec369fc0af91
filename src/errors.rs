use failure::Fail;

#[derive(Debug, Fail)]
pub enum NluError {
    #[fail(display = "Malformed artefact: {}", _0)]
    MalformedArtefact(String),
    #[fail(display = "Model for language '{}' has no trained artefacts", _0)]
    MissingArtefacts(String),
    #[fail(display = "Wrong slot tagger format: {}", _0)]
    WrongSlotTaggerFormat(String),
    #[fail(display = "No predictors loaded for language '{}'", _0)]
    NoPredictors(String),
    #[fail(display = "Poisoned lock: {}", _0)]
    PoisonedLock(String),
    #[fail(display = "Internal error: {}", _0)]
    InternalError(String),
}

pub type Result<T> = ::std::result::Result<T, ::failure::Error>;
