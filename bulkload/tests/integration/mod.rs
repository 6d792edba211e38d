mod csv_source_test;
mod pipeline_test;
