pub mod predictor_engine;
