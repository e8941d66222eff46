use failure::Fail;

#[derive(Debug, Fail)]
pub enum SlotExtractionError {
    #[fail(display = "Slot extractor has not been trained")]
    NotTrained,
    #[fail(display = "Cannot train on an empty training corpus")]
    EmptyTrainingCorpus,
    #[fail(
        display = "Clustering requires at least {} distinct word vectors but found {}",
        required, found
    )]
    NotEnoughWordVectors { required: usize, found: usize },
}

pub type Result<T> = ::std::result::Result<T, ::failure::Error>;
