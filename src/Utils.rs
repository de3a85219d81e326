//! different utility modules used around the reconstruction pipeline
/// logger setup and saving of the sampled curves into csv
pub mod logger;
/// stacked plots of f, f' and f'' with marker lines
pub mod plots;
/// pretty-printed table of a finished reconstruction
pub mod summary;
/// parse document with structure like " title1 key1: value1, value2 key2: value2 title2 key3:value3, value4" into HashMap
pub mod task_parser;
