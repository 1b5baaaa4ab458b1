pub mod xkcd;
