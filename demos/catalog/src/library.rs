//! The catalog's data: an in-memory library of books and their chapters.

use std::fmt;

use viewtree::tree::UrlPart;

/// A book in the library. Addressed in URLs by its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub chapters: Vec<String>,
}

impl Book {
    fn new(id: i64, title: &str, author: &str, chapters: &[&str]) -> Self {
        Self {
            id,
            title: title.to_string(),
            author: author.to_string(),
            chapters: chapters.iter().map(ToString::to_string).collect(),
        }
    }

    /// Returns chapter `number`, counting from 1.
    pub fn chapter(&self, number: usize) -> Option<Chapter> {
        let title = self.chapters.get(number.checked_sub(1)?)?;
        Some(Chapter {
            number,
            title: title.clone(),
        })
    }

    /// Returns every chapter in order.
    pub fn all_chapters(&self) -> Vec<Chapter> {
        self.chapters
            .iter()
            .zip(1..)
            .map(|(title, number)| Chapter {
                number,
                title: title.clone(),
            })
            .collect()
    }
}

impl fmt::Display for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

impl UrlPart for Book {
    fn url_part(&self) -> String {
        self.id.to_string()
    }
}

/// A chapter of a book. Addressed in URLs by its number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    pub number: usize,
    pub title: String,
}

impl fmt::Display for Chapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {}", self.number, self.title)
    }
}

impl UrlPart for Chapter {
    fn url_part(&self) -> String {
        self.number.to_string()
    }
}

/// An in-memory library for demonstration purposes.
#[derive(Debug, Clone, Default)]
pub struct Library {
    books: Vec<Book>,
}

impl Library {
    /// Creates a library with sample data.
    pub fn with_sample_data() -> Self {
        Self {
            books: vec![
                Book::new(
                    1,
                    "The Rust Programming Language",
                    "Klabnik & Nichols",
                    &["Getting Started", "Ownership", "Structs", "Enums"],
                ),
                Book::new(
                    2,
                    "Programming Rust",
                    "Blandy, Orendorff & Tindall",
                    &["Systems Programmers Can Have Nice Things", "A Tour of Rust"],
                ),
                Book::new(
                    3,
                    "Rust for Rustaceans",
                    "Gjengset",
                    &["Foundations", "Types", "Designing Interfaces"],
                ),
            ],
        }
    }

    /// Returns all books, ordered by id.
    pub fn books(&self) -> &[Book] {
        &self.books
    }

    /// Returns a book by id.
    pub fn book(&self, id: i64) -> Option<&Book> {
        self.books.iter().find(|b| b.id == id)
    }

    /// Returns the most recently added book.
    pub fn latest(&self) -> Option<&Book> {
        self.books.iter().max_by_key(|b| b.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let library = Library::with_sample_data();
        assert_eq!(library.books().len(), 3);
        assert_eq!(library.book(2).unwrap().title, "Programming Rust");
        assert!(library.book(9).is_none());
        assert_eq!(library.latest().unwrap().id, 3);
    }

    #[test]
    fn test_chapters_count_from_one() {
        let library = Library::with_sample_data();
        let book = library.book(1).unwrap();
        assert_eq!(book.chapter(2).unwrap().title, "Ownership");
        assert!(book.chapter(0).is_none());
        assert!(book.chapter(5).is_none());
        assert_eq!(book.all_chapters().len(), 4);
        assert_eq!(book.chapter(1).unwrap().to_string(), "1. Getting Started");
        assert_eq!(book.url_part(), "1");
    }
}
